pub mod bonafide_web_server;
pub mod certificates;
pub mod core;
pub mod db;
pub mod jobs;
pub mod models;
pub mod routes;
pub mod storage;
pub mod workflow;
