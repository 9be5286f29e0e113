use crate::core::config::{IdentityConfig, ANDROID_NS};
use crate::core::error::RepackError;
use anyhow::Result;
use std::path::Path;

use super::xml::{ChildEdit, Element, XmlDocument};

/// Swap a leading `from` for `to`. Anything that does not start with `from` is
/// not ours to keep and yields `None`.
pub fn retarget_authority(authorities: &str, from: &str, to: &str) -> Option<String> {
    if authorities.starts_with(from) {
        Some(authorities.replacen(from, to, 1))
    } else {
        None
    }
}

/// Counts of what a manifest edit touched, for logging.
#[derive(Debug, Default, Eq, PartialEq)]
pub struct ManifestEdit {
    pub providers_kept: usize,
    pub providers_removed: usize,
    pub permissions_removed: usize,
}

/// Rebrand the decoded manifest document.
pub fn rebrand(
    doc: &mut XmlDocument,
    identity: &IdentityConfig,
    path: &Path,
) -> Result<ManifestEdit> {
    let android = doc.prefix_for(ANDROID_NS, "android");
    let mut edit = ManifestEdit::default();

    doc.root.set_attr("package", identity.package.as_str());

    let application = doc
        .root
        .find_child_mut("application")
        .ok_or_else(|| RepackError::structure_not_found(path, "<application>"))?;

    edit.providers_removed = application.edit_children("provider", |provider| {
        let authorities = provider
            .attr_ns(ANDROID_NS, "authorities")
            .unwrap_or_default();
        match retarget_authority(authorities, &identity.source_prefix, &identity.target_prefix) {
            Some(authorities) => {
                provider.set_attr_ns(ANDROID_NS, &android, "authorities", authorities);
                ChildEdit::Keep
            }
            None => ChildEdit::Remove,
        }
    });
    edit.providers_kept = application.children_named("provider").count();
    application.set_attr_ns(ANDROID_NS, &android, "usesCleartextTraffic", "true");

    edit.permissions_removed = doc.root.edit_children("permission", |permission| {
        let name = permission.attr_ns(ANDROID_NS, "name").unwrap_or_default();
        if name.starts_with(&identity.source_prefix) {
            ChildEdit::Remove
        } else {
            ChildEdit::Keep
        }
    });

    let mut uses_permission = Element::new("uses-permission");
    uses_permission.set_attr_ns(ANDROID_NS, &android, "name", identity.extra_permission.as_str());
    doc.root.append_child(uses_permission);

    Ok(edit)
}

/// Load, rebrand and overwrite the manifest at `path`. Nothing is written on failure.
pub fn modify_manifest(path: &Path, identity: &IdentityConfig) -> Result<()> {
    let mut doc = XmlDocument::load(path)?;
    let edit = rebrand(&mut doc, identity, path)?;
    doc.save(path)?;
    log::info!(
        "📝 Manifest now `{}`: kept {} providers, dropped {}, dropped {} permissions",
        identity.package,
        edit.providers_kept,
        edit.providers_removed,
        edit.permissions_removed
    );
    Ok(())
}
