use std::path::Path;

use mime::Mime;

/// Resolves the content type of a file.
pub trait MimeLookup: Send + Sync {
    fn lookup(&self, path: &Path) -> Option<Mime>;
}

/// Looks the content type up by file extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtensionMimeLookup;

impl MimeLookup for ExtensionMimeLookup {
    fn lookup(&self, path: &Path) -> Option<Mime> {
        mime_guess::from_path(path).first()
    }
}

impl<F> MimeLookup for F
where
    F: Fn(&Path) -> Option<Mime> + Send + Sync,
{
    fn lookup(&self, path: &Path) -> Option<Mime> {
        self(path)
    }
}
