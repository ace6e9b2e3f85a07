//! Input validation for API requests.
//!
//! This module provides validation functions for API request data,
//! ensuring all inputs meet the required format and constraints.
//!
//! Category, priority, and status are enumerated server-side: arbitrary
//! strings are rejected rather than trusted to the client option lists.
//!
//! For collecting multiple validation errors and returning them as an
//! ApiError, use the `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating email addresses (pragmatic, not RFC-complete)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9][-a-zA-Z0-9]*(\.[a-zA-Z0-9][-a-zA-Z0-9]*)+$"
    ).unwrap();

    /// Regex for validating hostel block identifiers (e.g. B1, A-2, North)
    static ref HOSTEL_BLOCK_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9][a-zA-Z0-9 -]*$"
    ).unwrap();

    /// Regex for validating room numbers (e.g. 101, G-12, 3B)
    static ref ROOM_NUMBER_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9][a-zA-Z0-9-]*$"
    ).unwrap();
}

/// Valid complaint categories
pub const VALID_CATEGORIES: [&str; 5] =
    ["Electrical", "Plumbing", "Cleaning", "Internet", "Other"];

/// Valid complaint priorities
pub const VALID_PRIORITIES: [&str; 3] = ["Low", "Medium", "High"];

/// Valid complaint statuses
pub const VALID_STATUSES: [&str; 3] = ["Pending", "In Progress", "Resolved"];

/// Validate a display name
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Name is required".to_string());
    }

    if name.len() > 100 {
        return Err("Name is too long (max 100 characters)".to_string());
    }

    Ok(())
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate a password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 6 {
        return Err("Password must be at least 6 characters".to_string());
    }

    if password.len() > 128 {
        return Err("Password is too long (max 128 characters)".to_string());
    }

    Ok(())
}

/// Validate a hostel block identifier
pub fn validate_hostel_block(block: &str) -> Result<(), String> {
    if block.is_empty() {
        return Err("Hostel block is required".to_string());
    }

    if block.len() > 32 {
        return Err("Hostel block is too long (max 32 characters)".to_string());
    }

    if !HOSTEL_BLOCK_REGEX.is_match(block) {
        return Err("Invalid hostel block format".to_string());
    }

    Ok(())
}

/// Validate a room number
pub fn validate_room_number(room: &str) -> Result<(), String> {
    if room.is_empty() {
        return Err("Room number is required".to_string());
    }

    if room.len() > 16 {
        return Err("Room number is too long (max 16 characters)".to_string());
    }

    if !ROOM_NUMBER_REGEX.is_match(room) {
        return Err("Invalid room number format".to_string());
    }

    Ok(())
}

/// Validate a complaint category against the allowed set
pub fn validate_category(category: &str) -> Result<(), String> {
    if category.is_empty() {
        return Err("Category is required".to_string());
    }

    if !VALID_CATEGORIES.contains(&category) {
        return Err(format!(
            "Invalid category. Must be one of: {}",
            VALID_CATEGORIES.join(", ")
        ));
    }

    Ok(())
}

/// Validate a complaint priority against the allowed set
pub fn validate_priority(priority: &str) -> Result<(), String> {
    if priority.is_empty() {
        return Err("Priority is required".to_string());
    }

    if !VALID_PRIORITIES.contains(&priority) {
        return Err(format!(
            "Invalid priority. Must be one of: {}",
            VALID_PRIORITIES.join(", ")
        ));
    }

    Ok(())
}

/// Validate a complaint status against the allowed set
pub fn validate_status(status: &str) -> Result<(), String> {
    if status.is_empty() {
        return Err("Status is required".to_string());
    }

    if !VALID_STATUSES.contains(&status) {
        return Err(format!(
            "Invalid status. Must be one of: {}",
            VALID_STATUSES.join(", ")
        ));
    }

    Ok(())
}

/// Validate a complaint description
pub fn validate_description(description: &str) -> Result<(), String> {
    if description.trim().is_empty() {
        return Err("Description is required".to_string());
    }

    if description.len() > 2000 {
        return Err("Description is too long (max 2000 characters)".to_string());
    }

    Ok(())
}
