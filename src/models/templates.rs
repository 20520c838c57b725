use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    Html,
    Pdf,
    Word,
}

impl TemplateType {
    /// File extension used when a stored template is offered for download.
    pub fn extension(&self) -> &'static str {
        match self {
            TemplateType::Html => "html",
            TemplateType::Pdf => "pdf",
            TemplateType::Word => "docx",
        }
    }
}

impl std::str::FromStr for TemplateType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "html" => Ok(TemplateType::Html),
            "pdf" => Ok(TemplateType::Pdf),
            "word" => Ok(TemplateType::Word),
            _ => Err(format!("Invalid template type: {}", s)),
        }
    }
}

impl std::fmt::Display for TemplateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TemplateType::Html => "html",
            TemplateType::Pdf => "pdf",
            TemplateType::Word => "word",
        };
        write!(f, "{}", s)
    }
}

/// A certificate document definition: inline HTML (`body`) or an uploaded
/// file (`file_path`, relative to the storage bucket directory).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CertificateTemplate {
    pub id: Uuid,
    pub name: String,
    pub template_type: String,
    pub body: Option<String>,
    pub file_path: Option<String>,
    pub created_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn template_type_round_trips() {
        for t in [TemplateType::Html, TemplateType::Pdf, TemplateType::Word] {
            assert_eq!(TemplateType::from_str(&t.to_string()).unwrap(), t);
        }
    }

    #[test]
    fn word_templates_download_as_docx() {
        assert_eq!(TemplateType::Word.extension(), "docx");
    }
}
