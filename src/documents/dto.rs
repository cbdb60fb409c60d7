use serde::Serialize;

/// One document slot as shown in the documents list.
#[derive(Debug, Serialize)]
pub struct DocumentEntry {
    pub kind: &'static str,
    pub label: &'static str,
    pub uploaded: bool,
    /// Short-lived presigned GET URL, present only for uploaded slots.
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentList {
    pub documents: Vec<DocumentEntry>,
}
