//! Multipart form collection shared by the upload endpoints.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::AppError;
use crate::services::Upload;

/// A fully buffered multipart form: text fields and file parts.
#[derive(Debug, Default)]
pub struct Form {
    fields: HashMap<String, String>,
    files: Vec<(String, Upload)>,
}

impl Form {
    /// Drain a multipart body. File parts are any part carrying a file name.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the body is not valid multipart.
    pub async fn collect(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid form data: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            if file_name.is_some() {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid file upload: {e}")))?;
                if bytes.is_empty() {
                    continue;
                }
                form.files.push((
                    name,
                    Upload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    },
                ));
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid form field: {e}")))?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    /// A trimmed, non-empty text field.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// A text field parsed into `T`; blank or unparseable values are `None`.
    #[must_use]
    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        self.text(name).and_then(|v| v.parse().ok())
    }

    /// A boolean field. Accepts `true`/`false` and `1`/`0`.
    #[must_use]
    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.text(name)?.to_ascii_lowercase().as_str() {
            "true" | "1" | "on" => Some(true),
            "false" | "0" | "off" => Some(false),
            _ => None,
        }
    }

    /// Take every file uploaded under `name`, in submission order.
    pub fn take_files(&mut self, name: &str) -> Vec<Upload> {
        let (matching, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(field, _)| field == name);
        self.files = rest;
        matching.into_iter().map(|(_, upload)| upload).collect()
    }

    /// Take the first file uploaded under `name`.
    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.take_files(name).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str) -> Upload {
        Upload {
            file_name: Some(name.to_string()),
            content_type: Some("image/png".to_string()),
            bytes: vec![1, 2, 3],
        }
    }

    fn form() -> Form {
        let mut form = Form::default();
        form.fields.insert("name".into(), "  ThinkPad X1 ".into());
        form.fields.insert("blank".into(), "   ".into());
        form.fields.insert("price".into(), "999.50".into());
        form.fields.insert("onSale".into(), "true".into());
        form.files.push(("images".into(), upload("a.png")));
        form.files.push(("other".into(), upload("b.png")));
        form.files.push(("images".into(), upload("c.png")));
        form
    }

    #[test]
    fn test_text_fields_are_trimmed() {
        let form = form();
        assert_eq!(form.text("name").as_deref(), Some("ThinkPad X1"));
        assert_eq!(form.text("blank"), None);
        assert_eq!(form.text("missing"), None);
    }

    #[test]
    fn test_typed_fields() {
        let form = form();
        assert_eq!(form.parse::<f64>("price"), Some(999.5));
        assert_eq!(form.parse::<i32>("name"), None);
        assert_eq!(form.flag("onSale"), Some(true));
        assert_eq!(form.flag("name"), None);
    }

    #[test]
    fn test_take_files_keeps_order_and_others() {
        let mut form = form();
        let images = form.take_files("images");
        let names: Vec<_> = images.iter().filter_map(|u| u.file_name.as_deref()).collect();
        assert_eq!(names, ["a.png", "c.png"]);
        assert!(form.take_file("images").is_none());
        assert_eq!(form.take_file("other").and_then(|u| u.file_name), Some("b.png".into()));
    }
}
