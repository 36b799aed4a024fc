//! Template Extractor (spec §4.1): pure function from a declarative workload
//! object to the set of container image references it contains.
//!
//! Grounded on original_source/source/utils.go's `emitImagesFromTemplatesToChan`
//! and original_source/source/argo_shared.go's `getImageSetFromTemplates`,
//! generalized to also cover script containers and container groups per
//! spec §4.1 (the original only covered main + init containers).

use std::collections::HashSet;

use crate::error::ExtractError;
use crate::image_ref::ImageRef;

/// A single container reference inside a template, as seen on the wire.
///
/// `image` is `None`/empty when the upstream object is malformed (e.g. a
/// container stanza present without an image field) — this is the seam
/// through which `Extract` can fail per spec §4.1.
#[derive(Debug, Clone, Default)]
pub struct RawContainer {
    pub image: Option<String>,
}

impl RawContainer {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: Some(image.into()),
        }
    }

    fn extract(&self) -> Result<ImageRef, ExtractError> {
        match &self.image {
            Some(image) if !image.is_empty() => Ok(ImageRef::from(image.as_str())),
            _ => Err(ExtractError::MalformedTemplate(
                "container is missing an image reference".to_string(),
            )),
        }
    }
}

/// One template within a workload object: a main container, optional init
/// containers, an optional script container, and an optional container
/// group (spec §4.1, items 1-4).
#[derive(Debug, Clone, Default)]
pub struct WorkloadTemplate {
    pub main_container: Option<RawContainer>,
    pub init_containers: Vec<RawContainer>,
    pub script_container: Option<RawContainer>,
    pub container_group: Vec<RawContainer>,
}

/// A declarative workload object (a workflow template, cluster workflow
/// template, or cron workflow's embedded workflow spec): a list of
/// templates, each of which may reference zero or more images.
#[derive(Debug, Clone, Default)]
pub struct WorkloadObject {
    pub templates: Vec<WorkloadTemplate>,
}

/// Extract every image reference from a workload object.
///
/// Total over well-typed objects. A malformed container stanza (present but
/// missing its image) fails the whole extraction with `MalformedTemplate`;
/// the caller logs and skips the object (spec §4.1).
pub fn extract(object: &WorkloadObject) -> Result<HashSet<ImageRef>, ExtractError> {
    let mut images = HashSet::new();

    for template in &object.templates {
        if let Some(main) = &template.main_container {
            images.insert(main.extract()?);
        }

        for init in &template.init_containers {
            images.insert(init.extract()?);
        }

        if let Some(script) = &template.script_container {
            images.insert(script.extract()?);
        }

        for container in &template.container_group {
            images.insert(container.extract()?);
        }
    }

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn images(refs: &[&str]) -> HashSet<ImageRef> {
        refs.iter().map(|s| ImageRef::from(*s)).collect()
    }

    #[test]
    fn extracts_main_container() {
        let object = WorkloadObject {
            templates: vec![WorkloadTemplate {
                main_container: Some(RawContainer::new("alpine")),
                ..Default::default()
            }],
        };

        assert_eq!(extract(&object).unwrap(), images(&["alpine"]));
    }

    #[test]
    fn extracts_init_and_script_containers() {
        let object = WorkloadObject {
            templates: vec![WorkloadTemplate {
                init_containers: vec![RawContainer::new("alpine")],
                script_container: Some(RawContainer::new("debian")),
                ..Default::default()
            }],
        };

        assert_eq!(extract(&object).unwrap(), images(&["alpine", "debian"]));
    }

    #[test]
    fn extracts_container_group() {
        let object = WorkloadObject {
            templates: vec![WorkloadTemplate {
                container_group: vec![RawContainer::new("alpine"), RawContainer::new("debian")],
                ..Default::default()
            }],
        };

        assert_eq!(extract(&object).unwrap(), images(&["alpine", "debian"]));
    }

    #[test]
    fn collapses_duplicates_within_one_object() {
        let object = WorkloadObject {
            templates: vec![
                WorkloadTemplate {
                    main_container: Some(RawContainer::new("alpine")),
                    ..Default::default()
                },
                WorkloadTemplate {
                    init_containers: vec![RawContainer::new("alpine")],
                    ..Default::default()
                },
            ],
        };

        assert_eq!(extract(&object).unwrap(), images(&["alpine"]));
    }

    #[test]
    fn malformed_container_fails_whole_extraction() {
        let object = WorkloadObject {
            templates: vec![WorkloadTemplate {
                main_container: Some(RawContainer { image: None }),
                ..Default::default()
            }],
        };

        assert!(matches!(
            extract(&object),
            Err(ExtractError::MalformedTemplate(_))
        ));
    }

    #[test]
    fn empty_object_is_total_and_empty() {
        let object = WorkloadObject::default();
        assert_eq!(extract(&object).unwrap(), HashSet::new());
    }
}
