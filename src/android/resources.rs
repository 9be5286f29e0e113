use crate::core::error::RepackError;
use anyhow::Result;
use std::path::Path;

use super::xml::XmlDocument;

pub const APP_NAME_KEY: &str = "app_name";

/// Overwrite the text of `<string name="{key}">`. A missing key is an error, it is never created.
pub fn set_string(doc: &mut XmlDocument, key: &str, value: &str, path: &Path) -> Result<()> {
    let string = doc
        .root
        .find_child_where_mut("string", |string| string.attr("name") == Some(key))
        .ok_or_else(|| {
            RepackError::structure_not_found(path, format!("<string name=\"{}\">", key))
        })?;
    string.set_text(value);
    Ok(())
}

/// Rename the application in one `strings.xml`, in place.
pub fn modify_app_name(path: &Path, app_name: &str) -> Result<()> {
    let mut doc = XmlDocument::load(path)?;
    set_string(&mut doc, APP_NAME_KEY, app_name, path)?;
    doc.save(path)?;
    log::info!("🏷️ `{}` is now \"{}\"", path.display(), app_name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const STRINGS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<resources>
    <string name="abc_action_bar_home_description">Navigate home</string>
    <string name="app_name">Arknights</string>
    <string name="app_name_suffix">EN</string>
</resources>
"#;

    #[test]
    fn should_replace_app_name_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("strings.xml");
        fs::write(&path, STRINGS).unwrap();

        modify_app_name(&path, "PvZ Online").unwrap();

        let doc = XmlDocument::load(&path).unwrap();
        let texts: Vec<_> = doc
            .root
            .children_named("string")
            .map(|s| (s.attr("name").unwrap().to_string(), s.text()))
            .collect();
        assert_eq!(
            texts,
            vec![
                (
                    "abc_action_bar_home_description".to_string(),
                    "Navigate home".to_string()
                ),
                ("app_name".to_string(), "PvZ Online".to_string()),
                ("app_name_suffix".to_string(), "EN".to_string()),
            ]
        );
        assert!(fs::read_to_string(&path)
            .unwrap()
            .starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    }

    #[test]
    fn should_fail_without_app_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("strings.xml");
        let original = "<resources><string name=\"other\">x</string></resources>";
        fs::write(&path, original).unwrap();

        let err = modify_app_name(&path, "PvZ Online").unwrap_err();

        assert!(matches!(
            err.downcast_ref::<RepackError>(),
            Some(RepackError::StructureNotFound { .. })
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn should_fail_on_missing_file() {
        let dir = tempdir().unwrap();
        let err = modify_app_name(&dir.path().join("strings.xml"), "PvZ Online").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RepackError>(),
            Some(RepackError::Io { .. })
        ));
    }
}
