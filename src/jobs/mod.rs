pub mod semester_refresh;
