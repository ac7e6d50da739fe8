// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn loading(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Loading,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Receives user-facing notifications emitted by the controller.
pub trait Notifier {
    fn notify(&mut self, notice: Notice);
}

impl<N: Notifier + ?Sized> Notifier for &mut N {
    fn notify(&mut self, notice: Notice) {
        (**self).notify(notice);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLabel {
    pub singular: &'static str,
    pub plural: &'static str,
}

impl ResourceLabel {
    pub fn singular_lower(self) -> String {
        self.singular.to_lowercase()
    }

    pub fn plural_lower(self) -> String {
        self.plural.to_lowercase()
    }
}

pub const PRODUCTS: ResourceLabel = ResourceLabel {
    singular: "Product",
    plural: "Products",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    SoftDelete,
    HardDelete,
    Restore,
    Feature,
    Unfeature,
}

impl MutationKind {
    const fn progressive(self) -> &'static str {
        match self {
            Self::Create => "Creating",
            Self::Update => "Updating",
            Self::SoftDelete => "Trashing",
            Self::HardDelete => "Deleting",
            Self::Restore => "Restoring",
            Self::Feature => "Featuring",
            Self::Unfeature => "Unfeaturing",
        }
    }

    const fn infinitive(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::SoftDelete => "trash",
            Self::HardDelete => "delete",
            Self::Restore => "restore",
            Self::Feature => "feature",
            Self::Unfeature => "unfeature",
        }
    }

    const fn past(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
            Self::SoftDelete => "trashed",
            Self::HardDelete => "deleted",
            Self::Restore => "restored",
            Self::Feature => "featured",
            Self::Unfeature => "unfeatured",
        }
    }

    const fn is_featuring(self) -> bool {
        matches!(self, Self::Feature | Self::Unfeature)
    }

    pub fn loading_message(self, label: ResourceLabel) -> String {
        format!("{} {}...", self.progressive(), label.singular_lower())
    }

    pub fn success_message(self, label: ResourceLabel) -> String {
        if self.is_featuring() {
            format!("{} {}.", label.singular, self.past())
        } else {
            format!("{} {} successfully", label.singular, self.past())
        }
    }

    pub fn error_message(self, label: ResourceLabel) -> String {
        if self.is_featuring() {
            format!(
                "Error {} {}.",
                self.progressive().to_lowercase(),
                label.singular_lower()
            )
        } else {
            format!("Failed to {} {}", self.infinitive(), label.singular_lower())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MutationKind, PRODUCTS};

    #[test]
    fn crud_messages_use_singular_label() {
        assert_eq!(
            MutationKind::Create.loading_message(PRODUCTS),
            "Creating product..."
        );
        assert_eq!(
            MutationKind::Update.success_message(PRODUCTS),
            "Product updated successfully"
        );
        assert_eq!(
            MutationKind::HardDelete.error_message(PRODUCTS),
            "Failed to delete product"
        );
    }

    #[test]
    fn delete_intents_have_distinct_verbs() {
        assert_eq!(
            MutationKind::SoftDelete.loading_message(PRODUCTS),
            "Trashing product..."
        );
        assert_eq!(
            MutationKind::Restore.success_message(PRODUCTS),
            "Product restored successfully"
        );
        assert_eq!(
            MutationKind::SoftDelete.error_message(PRODUCTS),
            "Failed to trash product"
        );
    }

    #[test]
    fn featuring_messages_are_terse() {
        assert_eq!(
            MutationKind::Feature.loading_message(PRODUCTS),
            "Featuring product..."
        );
        assert_eq!(
            MutationKind::Unfeature.success_message(PRODUCTS),
            "Product unfeatured."
        );
        assert_eq!(
            MutationKind::Feature.error_message(PRODUCTS),
            "Error featuring product."
        );
    }
}
