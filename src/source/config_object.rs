//! Configuration-object source (spec §4.2.2): decodes an explicit image list
//! from a declarative object's data, restricted to objects matching a label
//! selector. Grounded on original_source/source/configmap.go (`defaultImagesKey`,
//! `imagesKeyAnnotation`, `sigs.k8s.io/yaml` decode, `WithConfigMapSelector`).

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::error::ConfigDecodeError;
use crate::image_ref::ImageRef;

use super::{watch_source, SourceHandle};

pub const DEFAULT_IMAGES_KEY: &str = "images";
const IMAGES_KEY_ANNOTATION: &str = "image-cache-daemon/key";
pub const DEFAULT_SELECTOR_KEY: &str = "app.kubernetes.io/part-of";
pub const DEFAULT_SELECTOR_VALUE: &str = "image-cache-daemon";

/// A declarative configuration object carrying an explicit image list
/// (spec §4.2.2) — the generalized analog of a Kubernetes ConfigMap.
#[derive(Debug, Clone, Default)]
pub struct ConfigObject {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    /// Raw string data, one key of which (`DEFAULT_IMAGES_KEY` unless
    /// overridden by the `image-cache-daemon/key` annotation) holds a YAML
    /// sequence of image references.
    pub data: BTreeMap<String, String>,
}

/// An equality label selector (spec §6's configurable default,
/// `app.kubernetes.io/part-of=image-cache-daemon`).
#[derive(Debug, Clone)]
pub struct LabelSelector {
    pub key: String,
    pub value: String,
}

impl Default for LabelSelector {
    fn default() -> Self {
        Self {
            key: DEFAULT_SELECTOR_KEY.to_string(),
            value: DEFAULT_SELECTOR_VALUE.to_string(),
        }
    }
}

impl LabelSelector {
    fn matches(&self, object: &ConfigObject) -> bool {
        object.labels.get(&self.key).map(String::as_str) == Some(self.value.as_str())
    }
}

fn images_key(object: &ConfigObject) -> &str {
    object
        .annotations
        .get(IMAGES_KEY_ANNOTATION)
        .map(String::as_str)
        .unwrap_or(DEFAULT_IMAGES_KEY)
}

fn decode(object: &ConfigObject) -> Result<HashSet<ImageRef>, ConfigDecodeError> {
    let key = images_key(object);
    let raw = object.data.get(key).ok_or_else(|| ConfigDecodeError::MissingKey {
        namespace: object.namespace.clone(),
        name: object.name.clone(),
        key: key.to_string(),
    })?;

    let list: Vec<String> = serde_yaml::from_str(raw).map_err(|err| ConfigDecodeError::Invalid {
        namespace: object.namespace.clone(),
        name: object.name.clone(),
        key: key.to_string(),
        reason: err.to_string(),
    })?;

    Ok(list.into_iter().map(ImageRef::from).collect())
}

/// Build a configuration-object source over `catalog`, restricted to objects
/// matching `selector`. An object that doesn't match contributes no images
/// but is still tracked, so a later label change is picked up on its next
/// update.
pub fn config_object_source(
    name: impl Into<String>,
    catalog: Arc<dyn Catalog<ConfigObject>>,
    selector: LabelSelector,
) -> SourceHandle {
    watch_source(name, catalog, move |object: &ConfigObject| {
        if !selector.matches(object) {
            return Ok(HashSet::new());
        }
        decode(object).map_err(|err| err.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::InMemoryCatalog;
    use crate::source::Source;
    use std::time::Duration;
    use tokio::sync::watch;

    fn object(data: &[(&str, &str)], labels: &[(&str, &str)], annotations: &[(&str, &str)]) -> ConfigObject {
        ConfigObject {
            name: "cfg".to_string(),
            namespace: "default".to_string(),
            labels: labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            annotations: annotations
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            data: data.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    fn matching_labels() -> Vec<(&'static str, &'static str)> {
        vec![(DEFAULT_SELECTOR_KEY, DEFAULT_SELECTOR_VALUE)]
    }

    #[tokio::test]
    async fn decodes_default_images_key() {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.push_add(
            "default/cfg",
            object(&[("images", "- alpine\n- debian\n")], &matching_labels(), &[]),
        );
        catalog.mark_synced();

        let handle = config_object_source("config", catalog, LabelSelector::default());
        let (_tx, shutdown_rx) = watch::channel(false);
        let source = handle.source.clone();
        let run = tokio::spawn(async move { source.run(shutdown_rx).await });

        let mut stream = handle.stream;
        let mut seen = HashSet::new();
        seen.insert(stream.recv().await.unwrap());
        seen.insert(stream.recv().await.unwrap());
        assert_eq!(seen, [ImageRef::from("alpine"), ImageRef::from("debian")].into());

        drop(stream);
        let _ = tokio::time::timeout(Duration::from_millis(50), run).await;
    }

    #[tokio::test]
    async fn honors_alternate_key_annotation() {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.push_add(
            "default/cfg",
            object(
                &[("custom", "- alpine\n")],
                &matching_labels(),
                &[(IMAGES_KEY_ANNOTATION, "custom")],
            ),
        );
        catalog.mark_synced();

        let handle = config_object_source("config", catalog, LabelSelector::default());
        let (_tx, shutdown_rx) = watch::channel(false);
        let source = handle.source.clone();
        let run = tokio::spawn(async move { source.run(shutdown_rx).await });

        let mut stream = handle.stream;
        assert_eq!(stream.recv().await, Some(ImageRef::from("alpine")));

        drop(stream);
        let _ = tokio::time::timeout(Duration::from_millis(50), run).await;
    }

    #[tokio::test]
    async fn missing_key_emits_nothing() {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.push_add("default/cfg", object(&[], &matching_labels(), &[]));
        catalog.mark_synced();

        let handle = config_object_source("config", catalog, LabelSelector::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let source = handle.source.clone();
        let run = tokio::spawn(async move { source.run(shutdown_rx).await });

        let mut stream = handle.stream;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(source.snapshot(), HashSet::new());

        shutdown_tx.send(true).unwrap();
        drop(stream);
        run.await.unwrap();
    }

    #[tokio::test]
    async fn non_matching_labels_contribute_no_images() {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.push_add(
            "default/cfg",
            object(&[("images", "- alpine\n")], &[("team", "other")], &[]),
        );
        catalog.mark_synced();

        let handle = config_object_source("config", catalog, LabelSelector::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let source = handle.source.clone();
        let run = tokio::spawn(async move { source.run(shutdown_rx).await });

        let mut stream = handle.stream;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(source.snapshot(), HashSet::new());

        shutdown_tx.send(true).unwrap();
        drop(stream);
        run.await.unwrap();
    }
}
