use std::path::PathBuf;

/// The non-privileged account whose key gets enrolled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUser {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
}

impl TargetUser {
    pub fn is_root(&self) -> bool {
        self.uid == 0
    }
}

/// Owner of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

impl From<&TargetUser> for Owner {
    fn from(user: &TargetUser) -> Self {
        Self {
            uid: user.uid,
            gid: user.gid,
        }
    }
}
