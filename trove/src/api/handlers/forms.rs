//! Multipart form parsing for the upload-carrying endpoints.
//!
//! Browsers submit the create/update forms as `multipart/form-data` mixing
//! text fields and files. This drains the stream once into an addressable
//! form, optionally enforcing a per-file size cap for the paths that have
//! one.

use axum::extract::Multipart;
use std::collections::HashMap;
use std::str::FromStr;

use crate::errors::{Error, Result};

/// One uploaded file part with a non-empty body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content: Vec<u8>,
}

/// A fully drained multipart submission.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: Vec<(String, UploadedFile)>,
}

impl MultipartForm {
    /// Drain the multipart stream.
    ///
    /// `max_file_bytes` bounds each file part when given; paths without a
    /// cap accept whatever the HTTP body limit lets through.
    pub async fn from_multipart(mut multipart: Multipart, max_file_bytes: Option<usize>) -> Result<Self> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| Error::BadRequest {
            message: format!("Failed to parse multipart data: {e}"),
        })? {
            let name = field.name().unwrap_or("").to_string();
            let filename = field.file_name().map(|f| f.to_string()).filter(|f| !f.is_empty());

            match filename {
                Some(filename) => {
                    let content = field
                        .bytes()
                        .await
                        .map_err(|e| Error::BadRequest {
                            message: format!("Failed to read file field {name}: {e}"),
                        })?
                        .to_vec();

                    if let Some(max) = max_file_bytes {
                        if content.len() > max {
                            return Err(Error::PayloadTooLarge {
                                message: format!("File {filename} exceeds maximum size of {} bytes", max),
                            });
                        }
                    }

                    // Browsers send an empty file part for untouched inputs
                    if !content.is_empty() {
                        form.files.push((name, UploadedFile { filename, content }));
                    }
                }
                None => {
                    let text = field.text().await.map_err(|e| Error::BadRequest {
                        message: format!("Failed to read field {name}: {e}"),
                    })?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    /// Required non-empty text field.
    pub fn text(&self, name: &str) -> Result<String> {
        match self.fields.get(name).map(|s| s.trim()) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(Error::BadRequest {
                message: format!("Missing required field: {name}"),
            }),
        }
    }

    /// Optional text field; empty submissions count as absent.
    pub fn text_opt(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
    }

    /// Required typed field.
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<T> {
        self.text(name)?.parse().map_err(|_| Error::BadRequest {
            message: format!("Invalid value for field: {name}"),
        })
    }

    /// Optional typed field; missing or empty yields the default.
    pub fn parse_or<T: FromStr>(&self, name: &str, default: T) -> Result<T> {
        match self.parse_opt(name)? {
            Some(value) => Ok(value),
            None => Ok(default),
        }
    }

    /// Optional typed field.
    pub fn parse_opt<T: FromStr>(&self, name: &str) -> Result<Option<T>> {
        match self.text_opt(name) {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| Error::BadRequest {
                    message: format!("Invalid value for field: {name}"),
                }),
            None => Ok(None),
        }
    }

    /// Take the first file submitted under `name`, if any.
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        let index = self.files.iter().position(|(field, _)| field == name)?;
        Some(self.files.remove(index).1)
    }

    /// Take every file submitted under `name`, in submission order.
    pub fn take_files(&mut self, name: &str) -> Vec<UploadedFile> {
        let mut taken = Vec::new();
        let mut index = 0;
        while index < self.files.len() {
            if self.files[index].0 == name {
                taken.push(self.files.remove(index).1);
            } else {
                index += 1;
            }
        }
        taken
    }
}
