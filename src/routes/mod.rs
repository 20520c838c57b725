use actix_web::web::{scope, ServiceConfig};
use actix_web::Scope;

use batches::{
    create_batch, list_batches, refresh_semesters, set_batch_semester, toggle_batch_status,
    update_batch,
};
use departments::{create_department, delete_department, list_departments, update_department};
use requests::{
    approve_request, forward_request, get_request, list_all_requests, my_requests,
    pending_requests, request_history, return_request, submit_request,
};
use students::{
    create_student, download_import_template, get_student, import_students, list_students,
    resync_assignments,
};
use templates::{
    create_template, delete_template, download_template_file, list_templates, update_template,
};
use users::{
    admin_delete_staff, admin_update_user, change_password, get_profile, list_users, login,
    register, update_profile,
};

mod batches;
mod departments;
mod health_check;
mod multipart;
mod requests;
mod students;
mod templates;
mod users;

use crate::routes::health_check::*;

fn util_routes() -> Scope {
    scope("").service(health_check)
}

fn auth_routes() -> Scope {
    scope("auth")
        .service(register)
        .service(login)
        .service(get_profile)
        .service(update_profile)
        .service(change_password)
        .service(list_users)
        .service(admin_update_user)
        .service(admin_delete_staff)
}

fn students_routes() -> Scope {
    // Fixed paths first so `/{student_id}` cannot shadow them.
    scope("students")
        .service(download_import_template)
        .service(import_students)
        .service(resync_assignments)
        .service(create_student)
        .service(list_students)
        .service(get_student)
}

fn departments_routes() -> Scope {
    scope("departments")
        .service(create_department)
        .service(list_departments)
        .service(update_department)
        .service(delete_department)
}

fn batches_routes() -> Scope {
    scope("batches")
        .service(refresh_semesters)
        .service(create_batch)
        .service(list_batches)
        .service(set_batch_semester)
        .service(toggle_batch_status)
        .service(update_batch)
}

fn templates_routes() -> Scope {
    scope("templates")
        .service(create_template)
        .service(list_templates)
        .service(download_template_file)
        .service(update_template)
        .service(delete_template)
}

fn requests_routes() -> Scope {
    scope("requests")
        .service(my_requests)
        .service(pending_requests)
        .service(request_history)
        .service(submit_request)
        .service(list_all_requests)
        .service(forward_request)
        .service(return_request)
        .service(approve_request)
        .service(get_request)
}

pub fn bonafide_portal_routes(conf: &mut ServiceConfig) {
    conf.service(
        scope("api/v1")
            .service(auth_routes())
            .service(students_routes())
            .service(departments_routes())
            .service(batches_routes())
            .service(templates_routes())
            .service(requests_routes())
            .service(util_routes()),
    );
}
