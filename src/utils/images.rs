/// Kinds of uploaded images the API hands back as paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Car,
    DriverProfile,
    DriverLicense,
}

impl ImageKind {
    fn placeholder(&self) -> &'static str {
        match self {
            ImageKind::Car => "https://via.placeholder.com/150?text=No+Image",
            ImageKind::DriverProfile => "https://via.placeholder.com/150?text=Driver",
            ImageKind::DriverLicense => "https://via.placeholder.com/300x200?text=License",
        }
    }

    /// Driver uploads are served flat from `/uploads/` whatever directory
    /// the server recorded.
    fn flat_prefix(&self) -> Option<&'static str> {
        match self {
            ImageKind::Car => None,
            ImageKind::DriverProfile => Some("profileImage-"),
            ImageKind::DriverLicense => Some("licenseImage-"),
        }
    }
}

/// Turns stored image paths into absolute URLs against the asset server.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    base_url: String,
}

impl ImageResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn resolve(&self, kind: ImageKind, path: Option<&str>) -> String {
        let path = match path.map(str::trim) {
            Some(p) if !p.is_empty() => p,
            _ => return kind.placeholder().to_string(),
        };

        if path.starts_with("http://") || path.starts_with("https://") {
            return match kind.flat_prefix() {
                Some(prefix) => {
                    let file_name = file_name(path);
                    if file_name.starts_with(prefix) {
                        format!("{}/uploads/{}", self.base_url, file_name)
                    } else {
                        path.to_string()
                    }
                }
                None => path.to_string(),
            };
        }

        let mut formatted = if path.contains("/src/uploads/") {
            path.replacen("/src/uploads/", "/uploads/", 1)
        } else if !path.starts_with('/') {
            format!("/{}", path)
        } else {
            path.to_string()
        };

        if let Some(prefix) = kind.flat_prefix() {
            if formatted.contains(prefix) {
                formatted = format!("/uploads/{}", file_name(&formatted));
            }
        }

        format!("{}{}", self.base_url, formatted)
    }

    pub fn car(&self, path: Option<&str>) -> String {
        self.resolve(ImageKind::Car, path)
    }

    pub fn driver_profile(&self, path: Option<&str>) -> String {
        self.resolve(ImageKind::DriverProfile, path)
    }

    pub fn driver_license(&self, path: Option<&str>) -> String {
        self.resolve(ImageKind::DriverLicense, path)
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
