//! Client-side form checks.
//!
//! Everything here is synchronous and runs before a request is built; a
//! failing form never reaches the network.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::ValidationErrors;
use crate::models::{InviteRole, NewInvite, NewOrganization, NewProject};

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static PROJECT_KEY_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z0-9]+$").unwrap());
static SLUG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").unwrap());
static NON_SLUG_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Longest key accepted by the project create/edit form.
pub const PROJECT_FORM_KEY_MAX: usize = 5;
/// Key bounds used by the onboarding project step.
pub const ONBOARDING_KEY_MIN: usize = 2;
pub const ONBOARDING_KEY_MAX: usize = 10;
pub const MIN_NAME_LEN: usize = 2;
pub const MIN_SLUG_LEN: usize = 2;

/// Project create/edit form. The key is uppercased before submit.
pub fn project_form(
    name: &str,
    key: &str,
    description: Option<&str>,
) -> Result<NewProject, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = name.trim();
    let key = key.trim().to_uppercase();

    if name.is_empty() {
        errors.add("name", "Name is required");
    }
    if key.is_empty() {
        errors.add("key", "Key is required");
    } else if key.chars().count() > PROJECT_FORM_KEY_MAX {
        errors.add("key", "Key must be 5 characters or less");
    }
    errors.into_result()?;

    Ok(NewProject {
        name: name.to_string(),
        key,
        description: description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string),
        organization_id: None,
    })
}

/// Onboarding project step: stricter key shape than the regular form.
pub fn onboarding_project(name: &str, key: &str) -> Result<NewProject, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if name.chars().count() < MIN_NAME_LEN {
        errors.add("name", "Project name must be at least 2 characters");
    }
    let key_len = key.chars().count();
    if key_len < ONBOARDING_KEY_MIN {
        errors.add("key", "Project key must be at least 2 characters");
    } else if key_len > ONBOARDING_KEY_MAX {
        errors.add("key", "Project key must be at most 10 characters");
    } else if !PROJECT_KEY_REGEX.is_match(key) {
        errors.add(
            "key",
            "Project key can only contain uppercase letters and numbers",
        );
    }
    errors.into_result()?;

    Ok(NewProject {
        name: name.to_string(),
        key: key.to_string(),
        description: None,
        organization_id: None,
    })
}

/// Suggested project key for a name: uppercase alphanumerics, at most 10.
pub fn derive_project_key(name: &str) -> String {
    name.to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .take(ONBOARDING_KEY_MAX)
        .collect()
}

/// Suggested organization slug for a name.
pub fn derive_slug(name: &str) -> String {
    let lower = name.to_lowercase();
    NON_SLUG_RUN
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

pub fn organization(
    name: &str,
    slug: &str,
    description: Option<&str>,
) -> Result<NewOrganization, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if name.chars().count() < MIN_NAME_LEN {
        errors.add("name", "Organization name must be at least 2 characters");
    }
    if slug.chars().count() < MIN_SLUG_LEN {
        errors.add("slug", "Slug must be at least 2 characters");
    } else if !SLUG_REGEX.is_match(slug) {
        errors.add(
            "slug",
            "Slug can only contain lowercase letters, numbers, and hyphens",
        );
    }
    errors.into_result()?;

    Ok(NewOrganization {
        name: name.to_string(),
        slug: slug.to_string(),
        description: description.map(str::to_string),
    })
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Invite form. `pending` holds emails already queued in the same form.
pub fn invite<S: AsRef<str>>(
    email: &str,
    role: InviteRole,
    pending: &[S],
) -> Result<NewInvite, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let email = email.trim();

    if email.is_empty() {
        errors.add("email", "Please enter an email address");
    } else if !is_valid_email(email) {
        errors.add("email", "Please enter a valid email address");
    } else if pending.iter().any(|p| p.as_ref() == email) {
        errors.add("email", "This email has already been added");
    }
    errors.into_result()?;

    Ok(NewInvite {
        email: email.to_string(),
        role,
    })
}
