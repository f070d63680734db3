use std::path::PathBuf;

/// A udev rule file granting access to the key's device node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRule {
    pub path: PathBuf,
    pub contents: String,
}

impl DeviceRule {
    pub const YUBICO_HIDRAW: &'static str =
        "KERNEL==\"hidraw*\", SUBSYSTEM==\"hidraw\", ATTRS{idVendor}==\"1050\", MODE=\"0666\"\n";

    /// Rule for Yubico FIDO hidraw access
    pub fn yubico_fido() -> Self {
        Self {
            path: PathBuf::from("/etc/udev/rules.d/70-u2f.rules"),
            contents: Self::YUBICO_HIDRAW.to_string(),
        }
    }

    /// Surrounding whitespace is not significant to udev
    pub fn matches(&self, existing: &str) -> bool {
        existing.trim() == self.contents.trim()
    }
}
