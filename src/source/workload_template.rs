//! Workload-template sources (spec §4.2, §6): three thin instantiations of
//! the generic watch source over the shared template extractor, one each
//! for workflow templates, cluster workflow templates, and cron workflows.
//! Grounded on original_source/source/workflowtemplate.go,
//! clusterworkflowtemplate.go, and cronworkflowtemplate.go, each a few lines
//! wrapping `NewArgoTemplateSource` with a different underlying informer.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::extractor::{self, WorkloadObject};

use super::{watch_source, SourceHandle};

/// Build a workload-template source over `catalog`, using the shared
/// template extractor. `name` distinguishes the three instantiations
/// (`workflow-template`, `cluster-workflow-template`, `cron-workflow`) for
/// logging.
pub fn workload_template_source(
    name: impl Into<String>,
    catalog: Arc<dyn Catalog<WorkloadObject>>,
) -> SourceHandle {
    watch_source(name, catalog, |object: &WorkloadObject| {
        extractor::extract(object).map_err(|err| err.to_string())
    })
}
