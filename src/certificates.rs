//! Certificate rendering: named-placeholder substitution into an HTML
//! template body, plus the download naming rules for file-based templates.
//! PDF conversion of the filled document happens outside this service.

use chrono::NaiveDate;

use crate::core::semester::{batch_start_year, calculate_current_semester_for_batch};
use crate::models::requests::BonafideRequest;
use crate::models::students::StudentDetails;

const DEFAULT_NATIONALITY: &str = "Indian";

/// Fallback body for HTML templates created without one.
pub const DEFAULT_BONAFIDE_TEMPLATE: &str = r#"
<div style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 800px; margin: 0 auto; padding: 20px; border: 1px solid #eee;">
    <div style="text-align: center; margin-bottom: 30px;">
        <h1 style="color: #2c3e50; margin-bottom: 5px;">BONAFIDE CERTIFICATE</h1>
        <hr style="border: 0; height: 2px; background-color: #3498db; width: 80px; margin: 10px auto;">
    </div>

    <p style="margin-bottom: 15px;">This is to certify that Mr./Ms. <strong>{studentName}</strong>,</p>
    <p style="margin-bottom: 15px;">Son/Daughter of Mr./Mrs. <strong>{parentName}</strong>,</p>
    <p style="margin-bottom: 15px;">is/was a bonafide student of <strong>Adhiyamaan College of Engineering</strong>, located at <strong>Dr.M.G.R.Nagar, Hosur, Krishnagiri District, Tamil Nadu, India. Pin:635 130</strong>.</p>

    <p style="margin-bottom: 15px;">He/She has been studying in this institution from <strong>{admissionDate}</strong> to <strong>{presentDate}</strong>.</p>
    <p style="margin-bottom: 15px;">During this period, he/she has been enrolled in the Department of <strong>{department}</strong>.</p>
    <p style="margin-bottom: 15px;">His/Her enrollment/roll number is <strong>{studentId}</strong>.</p>
    <p style="margin-bottom: 15px;">His/Her date of birth as per our records is <strong>{studentDOB}</strong>.</p>
    <p style="margin-bottom: 15px;">His/Her nationality is <strong>{studentNationality}</strong>.</p>
    <p style="margin-bottom: 15px;">He/She has studied in this college up to <strong>Semester {currentSemester}</strong>.</p>

    <p style="margin-top: 30px; margin-bottom: 15px;">This certificate is issued upon his/her request for the purpose of <strong>{reason}</strong>.</p>

    <div style="margin-top: 40px;">
        <p><strong>Date:</strong> {issueDate}</p>
        <p><strong>Place:</strong> Hosur</p>
    </div>
</div>
"#;

const SIGNATURE_BLOCK: &str = r#"
<div style="margin-top: 40px; text-align: right;">
    <p style="margin-bottom: 50px;">&nbsp;</p>
    <p><strong>Electronically signed by the Principal</strong></p>
    <p><strong>Seal &amp; Signature of Head of Institution</strong></p>
</div>
"#;

/// Everything a template body can reference, resolved to plain strings.
#[derive(Debug, Clone)]
pub struct CertificateFields {
    pub student_name: String,
    pub parent_name: String,
    pub department: String,
    pub register_number: String,
    pub date_of_birth: String,
    pub nationality: String,
    pub current_semester: String,
    pub reason: String,
    pub admission_date: String,
    pub present_date: String,
    pub issue_date: String,
}

impl CertificateFields {
    /// Resolve the substitution values from a request and the student's
    /// joined detail record. Admission date is July 1 of the batch's start
    /// year; the current semester falls back to deriving from the batch
    /// name when the stored value is absent.
    pub fn from_parts(
        request: &BonafideRequest,
        student: &StudentDetails,
        today: NaiveDate,
    ) -> Self {
        let full_batch_name = student.full_batch_name();

        let current_semester = student
            .current_semester
            .unwrap_or_else(|| match &full_batch_name {
                Some(name) => calculate_current_semester_for_batch(name, today),
                None => 1,
            });

        let admission_date = full_batch_name
            .as_deref()
            .and_then(batch_start_year)
            .and_then(|year| NaiveDate::from_ymd_opt(year, 7, 1))
            .map(format_date_indian)
            .unwrap_or_else(|| "N/A".to_string());

        CertificateFields {
            student_name: student.display_name(),
            parent_name: student
                .parent_name
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
            department: student
                .department_name
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
            register_number: student.register_number.clone(),
            date_of_birth: student
                .date_of_birth
                .map(format_date_indian)
                .unwrap_or_else(|| "N/A".to_string()),
            nationality: student
                .nationality
                .clone()
                .unwrap_or_else(|| DEFAULT_NATIONALITY.to_string()),
            current_semester: current_semester.to_string(),
            reason: request.reason.clone(),
            admission_date,
            present_date: format_date_indian(today),
            issue_date: format_date_indian(today),
        }
    }

    fn substitutions(&self) -> [(&'static str, &str); 11] {
        [
            ("{studentName}", &self.student_name),
            ("{parentName}", &self.parent_name),
            ("{department}", &self.department),
            ("{studentId}", &self.register_number),
            ("{studentDOB}", &self.date_of_birth),
            ("{studentNationality}", &self.nationality),
            ("{currentSemester}", &self.current_semester),
            ("{reason}", &self.reason),
            ("{admissionDate}", &self.admission_date),
            ("{presentDate}", &self.present_date),
            ("{issueDate}", &self.issue_date),
        ]
    }
}

/// Fill an HTML template body. An empty or missing body falls back to the
/// built-in bonafide certificate.
pub fn render_certificate_html(
    body: Option<&str>,
    fields: &CertificateFields,
    with_signature: bool,
) -> String {
    let template = match body {
        Some(b) if !b.trim().is_empty() => b,
        _ => DEFAULT_BONAFIDE_TEMPLATE,
    };

    let mut filled = template.to_string();
    for (token, value) in fields.substitutions() {
        filled = filled.replace(token, value);
    }

    if with_signature {
        filled.push_str(SIGNATURE_BLOCK);
    }

    filled
}

/// dd/mm/yyyy, the format every certificate and listing uses.
pub fn format_date_indian(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Download name for a rendered HTML certificate.
pub fn rendered_certificate_file_name(register_number: &str) -> String {
    format!("Bonafide-{}.html", register_number)
}

/// Download name for a stored pdf/word template, offered without
/// transformation.
pub fn stored_template_file_name(template_name: &str, register_number: &str, ext: &str) -> String {
    format!("{}-{}.{}", template_name, register_number, ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use uuid::Uuid;

    fn sample_request() -> BonafideRequest {
        BonafideRequest {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            request_type: "Bonafide".to_string(),
            sub_type: Some("Bank Loan".to_string()),
            reason: "education loan application".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            status: "Pending Principal Approval".to_string(),
            return_reason: None,
            template_id: Some(Uuid::new_v4()),
            created_at: NaiveDateTime::from_timestamp_opt(0, 0).unwrap(),
            updated_at: NaiveDateTime::from_timestamp_opt(0, 0).unwrap(),
        }
    }

    fn sample_student() -> StudentDetails {
        StudentDetails {
            id: Uuid::new_v4(),
            first_name: "Priya".to_string(),
            last_name: Some("Raman".to_string()),
            username: "priya.r".to_string(),
            email: "priya@example.edu".to_string(),
            phone_number: None,
            register_number: "7376211CS239".to_string(),
            parent_name: Some("Raman K".to_string()),
            date_of_birth: NaiveDate::from_ymd_opt(2005, 8, 21),
            nationality: None,
            batch_id: Some(Uuid::new_v4()),
            batch_name: Some("2023-2027".to_string()),
            batch_section: Some("A".to_string()),
            current_semester: Some(4),
            department_id: Some(Uuid::new_v4()),
            department_name: Some("Computer Science and Engineering".to_string()),
            tutor_id: None,
            tutor_name: None,
            hod_id: None,
            hod_name: None,
            created_at: NaiveDateTime::from_timestamp_opt(0, 0).unwrap(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn no_placeholder_tokens_survive_rendering() {
        let fields = CertificateFields::from_parts(&sample_request(), &sample_student(), today());
        let html = render_certificate_html(None, &fields, true);

        for (token, _) in fields.substitutions() {
            assert!(!html.contains(token), "placeholder {} leaked through", token);
        }
    }

    #[test]
    fn rendered_certificate_carries_register_number_and_reason() {
        let fields = CertificateFields::from_parts(&sample_request(), &sample_student(), today());
        let html = render_certificate_html(None, &fields, false);

        assert!(html.contains("7376211CS239"));
        assert!(html.contains("education loan application"));
        assert!(html.contains("Priya Raman"));
        assert!(html.contains("Semester 4"));
    }

    #[test]
    fn signature_block_is_optional() {
        let fields = CertificateFields::from_parts(&sample_request(), &sample_student(), today());
        let signed = render_certificate_html(None, &fields, true);
        let unsigned = render_certificate_html(None, &fields, false);

        assert!(signed.contains("Electronically signed by the Principal"));
        assert!(!unsigned.contains("Electronically signed by the Principal"));
    }

    #[test]
    fn custom_body_is_used_when_present() {
        let fields = CertificateFields::from_parts(&sample_request(), &sample_student(), today());
        let html = render_certificate_html(
            Some("<p>{studentName} / {studentId}</p>"),
            &fields,
            false,
        );
        assert_eq!(html, "<p>Priya Raman / 7376211CS239</p>");
    }

    #[test]
    fn admission_date_derives_from_batch_start_year() {
        let fields = CertificateFields::from_parts(&sample_request(), &sample_student(), today());
        assert_eq!(fields.admission_date, "01/07/2023");
        assert_eq!(fields.present_date, "10/03/2025");
    }

    #[test]
    fn missing_batch_degrades_to_na_admission_date() {
        let mut student = sample_student();
        student.batch_name = None;
        student.batch_section = None;
        student.current_semester = None;
        let fields = CertificateFields::from_parts(&sample_request(), &student, today());
        assert_eq!(fields.admission_date, "N/A");
        assert_eq!(fields.current_semester, "1");
    }

    #[test]
    fn download_names_follow_register_number() {
        assert_eq!(
            rendered_certificate_file_name("7376211CS239"),
            "Bonafide-7376211CS239.html"
        );
        assert_eq!(
            stored_template_file_name("Standard Bonafide", "7376211CS239", "pdf"),
            "Standard Bonafide-7376211CS239.pdf"
        );
    }
}
