use serde::{Deserialize, Serialize};

/// Optional capabilities an executor backend advertises.
///
/// Providers hand this out without instantiating an executor, so dispatchers
/// can reject incompatible jobs before any resource is touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesInfo {
    pub variables: bool,
    pub image: bool,
    pub services: bool,
    pub artifacts: bool,
    pub cache: bool,
    pub shared: bool,
    pub upload_multiple_artifacts: bool,
    pub session: bool,
    pub terminal: bool,
}

impl FeaturesInfo {
    /// Descriptor with every capability enabled
    pub fn all() -> Self {
        Self {
            variables: true,
            image: true,
            services: true,
            artifacts: true,
            cache: true,
            shared: true,
            upload_multiple_artifacts: true,
            session: true,
            terminal: true,
        }
    }

    fn flags(&self) -> [(&'static str, bool); 9] {
        [
            ("variables", self.variables),
            ("image", self.image),
            ("services", self.services),
            ("artifacts", self.artifacts),
            ("cache", self.cache),
            ("shared", self.shared),
            ("upload_multiple_artifacts", self.upload_multiple_artifacts),
            ("session", self.session),
            ("terminal", self.terminal),
        ]
    }

    /// Names of the flags set in `required` that this descriptor lacks
    pub fn missing(&self, required: &FeaturesInfo) -> Vec<&'static str> {
        self.flags()
            .into_iter()
            .zip(required.flags())
            .filter(|((_, have), (_, want))| *want && !*have)
            .map(|((name, _), _)| name)
            .collect()
    }

    pub fn supports(&self, required: &FeaturesInfo) -> bool {
        self.missing(required).is_empty()
    }

    /// Names of all enabled flags, for diagnostics
    pub fn enabled(&self) -> Vec<&'static str> {
        self.flags()
            .into_iter()
            .filter(|(_, on)| *on)
            .map(|(name, _)| name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_supports_nothing_but_empty_requirements() {
        let none = FeaturesInfo::default();
        assert!(none.supports(&FeaturesInfo::default()));
        assert!(!none.supports(&FeaturesInfo { image: true, ..Default::default() }));
        assert!(none.enabled().is_empty());
    }

    #[test]
    fn missing_lists_only_unsupported_required_flags() {
        let have = FeaturesInfo { variables: true, artifacts: true, ..Default::default() };
        let want = FeaturesInfo {
            variables: true,
            image: true,
            services: true,
            ..Default::default()
        };
        assert_eq!(have.missing(&want), vec!["image", "services"]);
    }

    #[test]
    fn all_supports_anything() {
        let want =
            FeaturesInfo { session: true, terminal: true, cache: true, ..Default::default() };
        assert!(FeaturesInfo::all().supports(&want));
        assert_eq!(FeaturesInfo::all().enabled().len(), 9);
    }

    #[test]
    fn deserializes_partial_descriptor() {
        let f: FeaturesInfo = serde_json::from_str(r#"{"image": true}"#).unwrap();
        assert_eq!(f, FeaturesInfo { image: true, ..Default::default() });
    }
}
