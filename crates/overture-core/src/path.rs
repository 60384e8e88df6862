//! Canonical logical paths and URL templates of the served documents.

use crate::PackageName;

/// Root index document.
pub const PACKAGES_PATH: &str = "packages.json";

/// Package name list document.
pub const LIST_PATH: &str = "packages/list.json";

/// Placeholder substituted with `vendor/project` in URL templates.
pub const PACKAGE_PLACEHOLDER: &str = "%package%";

/// Placeholder substituted with a provider digest in URL templates.
pub const HASH_PLACEHOLDER: &str = "%hash%";

/// Relative `providers-url` template.
pub const PROVIDERS_URL_TEMPLATE: &str = "/p/%package%.json";

/// Relative `metadata-url` template.
pub const METADATA_URL_TEMPLATE: &str = "/p2/%package%.json";

/// Zipball path: `vendor/project/version/vendor-project-version.zip`.
#[must_use]
pub fn zipball_path(vendor: &str, project: &str, version: &str) -> String {
    format!("{vendor}/{project}/{version}/{vendor}-{project}-{version}.zip")
}

/// Provider path: `p/vendor/project.json`.
#[must_use]
pub fn provider_path(name: &PackageName) -> String {
    format!("p/{}/{}.json", name.vendor(), name.project())
}

/// v2 package path: `p2/vendor/project.json`, or `p2/vendor/project~dev.json`
/// for the development partition.
#[must_use]
pub fn package_path(name: &PackageName, dev: bool) -> String {
    let suffix = if dev { "~dev" } else { "" };
    format!("p2/{}/{}{suffix}.json", name.vendor(), name.project())
}

/// Join a base URL and a path with exactly one `/` between them.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Absolute `providers-url` of a repository served at `base`.
#[must_use]
pub fn providers_url(base: &str) -> String {
    join_url(base, PROVIDERS_URL_TEMPLATE)
}

/// Absolute `metadata-url` of a repository served at `base`.
#[must_use]
pub fn metadata_url(base: &str) -> String {
    join_url(base, METADATA_URL_TEMPLATE)
}

/// Absolute list URL of a repository served at `base`.
#[must_use]
pub fn list_url(base: &str) -> String {
    join_url(base, LIST_PATH)
}

/// Substitute `%package%` and, when given, `%hash%` in a URL template.
#[must_use]
pub fn expand_template(template: &str, name: &str, hash: Option<&str>) -> String {
    let url = template.replace(PACKAGE_PLACEHOLDER, name);
    match hash {
        Some(hash) => url.replace(HASH_PLACEHOLDER, hash),
        None => url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_paths() {
        let name = PackageName::new("acme", "widgets");
        assert_eq!(
            zipball_path("acme", "widgets", "1.0.0"),
            "acme/widgets/1.0.0/acme-widgets-1.0.0.zip"
        );
        assert_eq!(provider_path(&name), "p/acme/widgets.json");
        assert_eq!(package_path(&name, false), "p2/acme/widgets.json");
        assert_eq!(package_path(&name, true), "p2/acme/widgets~dev.json");
    }

    #[test]
    fn join_trims_slashes() {
        assert_eq!(join_url("http://host/", "/p/x.json"), "http://host/p/x.json");
        assert_eq!(join_url("http://host", "p/x.json"), "http://host/p/x.json");
        assert_eq!(
            providers_url("http://host/repository/php"),
            "http://host/repository/php/p/%package%.json"
        );
        assert_eq!(list_url("http://host/"), "http://host/packages/list.json");
    }

    #[test]
    fn template_expansion() {
        assert_eq!(
            expand_template("/p/%package%$%hash%.json", "a/b", Some("abc")),
            "/p/a/b$abc.json"
        );
        assert_eq!(
            expand_template("/p2/%package%.json", "a/b", None),
            "/p2/a/b.json"
        );
    }
}
