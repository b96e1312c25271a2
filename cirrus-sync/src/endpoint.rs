//! REST paths for object round trips.
//!
//! Built-in classes live at their own collection paths; every other class
//! lives under `classes/`.

/// Collection path for a class.
pub fn class_path(class_name: &str) -> String {
    match class_name {
        "user" => "users".to_string(),
        "role" => "roles".to_string(),
        "installation" => "installations".to_string(),
        "file" => "files".to_string(),
        "push" => "push".to_string(),
        other => format!("classes/{}", urlencoding::encode(other)),
    }
}

/// Path of a single object.
pub fn object_path(class_name: &str, object_id: &str) -> String {
    format!("{}/{}", class_path(class_name), urlencoding::encode(object_id))
}
