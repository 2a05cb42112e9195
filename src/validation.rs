//! Translates `validator::ValidationErrors` into the `{location, message,
//! type}` shape spec.md §6 specifies for 422 responses.
//!
//! `validator`'s field names are the Rust struct's own (snake_case) field
//! names, not the serde/JSON tag; a field-name resolver converts each
//! segment to camelCase to match the wire's JSON tag path (spec.md §9's
//! "process-wide request-body validator ... with a field-name resolver that
//! extracts the JSON tag"). Nested/flattened request bodies also pick up the
//! outer field name as a path segment (e.g. `blueprint_document.directory`)
//! that has no JSON counterpart once `#[serde(flatten)]` is applied; that
//! segment, along with any segment starting with an uppercase letter (the
//! literal "embedded struct noise" spec.md names), is elided.

use validator::{ValidationErrors, ValidationErrorsKind};

use crate::models::ValidationFieldError;

pub fn translate(errors: &ValidationErrors) -> Vec<ValidationFieldError> {
    let mut out = Vec::new();
    walk(errors, Vec::new(), &mut out);
    out
}

fn walk(errors: &ValidationErrors, prefix: Vec<String>, out: &mut Vec<ValidationFieldError>) {
    for (field, kind) in errors.errors() {
        let mut path = prefix.clone();
        path.push(field.to_string());

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    out.push(ValidationFieldError {
                        location: render_location(&path),
                        message: error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| default_message(&error.code)),
                        kind: error.code.to_string(),
                    });
                }
            }
            ValidationErrorsKind::Struct(nested) => walk(nested, path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    let mut item_path = path.clone();
                    item_path.push(index.to_string());
                    walk(nested, item_path, out);
                }
            }
        }
    }
}

fn default_message(code: &str) -> String {
    match code {
        "required" => "this field is required".to_string(),
        "length" => "this field has an invalid length".to_string(),
        other => format!("validation failed: {other}"),
    }
}

/// Builds `.a.b.c` from path segments, eliding anonymous-embedded-struct
/// noise: a segment elided entirely drops out rather than leaving a blank
/// `..` behind.
fn render_location(path: &[String]) -> String {
    let mut rendered = String::new();
    for segment in path {
        if is_embedded_struct_noise(segment) {
            continue;
        }
        rendered.push('.');
        rendered.push_str(&snake_to_camel(segment));
    }
    rendered
}

fn is_embedded_struct_noise(segment: &str) -> bool {
    segment == "blueprint_document"
        || segment
            .chars()
            .next()
            .map(|c| c.is_ascii_uppercase())
            .unwrap_or(false)
}

fn snake_to_camel(segment: &str) -> String {
    if segment.chars().all(|c| c.is_ascii_digit()) {
        return segment.to_string();
    }
    let mut out = String::with_capacity(segment.len());
    let mut upcase_next = false;
    for ch in segment.chars() {
        if ch == '_' {
            upcase_next = true;
            continue;
        }
        if upcase_next {
            out.extend(ch.to_uppercase());
            upcase_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BlueprintDocumentInfoRequest;
    use validator::Validate;

    #[derive(Debug, serde::Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct FakeRequest {
        #[validate]
        blueprint_document: BlueprintDocumentInfoRequest,
    }

    #[test]
    fn elides_flattened_wrapper_segment() {
        let request = FakeRequest {
            blueprint_document: BlueprintDocumentInfoRequest {
                file_source_scheme: "files".to_string(),
                directory: "/a".to_string(),
                blueprint_file: "x.yml".to_string(),
                location_metadata: Default::default(),
            },
        };
        let errors = request.validate().unwrap_err();
        let translated = translate(&errors);
        assert_eq!(translated.len(), 1);
        assert_eq!(translated[0].location, ".fileSourceScheme");
        assert_eq!(translated[0].kind, "oneof");
        assert_eq!(
            translated[0].message,
            "the value must be one of the following: file s3 gcs azureblob https"
        );
    }

    #[test]
    fn empty_directory_is_reported_with_camel_case_location() {
        let request = FakeRequest {
            blueprint_document: BlueprintDocumentInfoRequest {
                file_source_scheme: "file".to_string(),
                directory: String::new(),
                blueprint_file: "x.yml".to_string(),
                location_metadata: Default::default(),
            },
        };
        let errors = request.validate().unwrap_err();
        let translated = translate(&errors);
        assert!(translated.iter().any(|e| e.location == ".directory"));
    }

    #[test]
    fn snake_to_camel_converts_segments() {
        assert_eq!(snake_to_camel("file_source_scheme"), "fileSourceScheme");
        assert_eq!(snake_to_camel("directory"), "directory");
    }
}
