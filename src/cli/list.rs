use comfy_table::{Attribute, Cell, ContentArrangement, Table};

use super::Result;
use crate::{
    kubectl::{annotation, Kubectl, RayJob},
    status::map_to_client_status,
    time_ext::{self, OffsetDateTimeExt},
    user_host::UserHostRef,
};

struct Row {
    name: String,
    created: Option<time::OffsetDateTime>,
    started: Option<time::OffsetDateTime>,
    ended: Option<time::OffsetDateTime>,
    deployment_status: String,
    client_status: String,
    cluster: Option<String>,
    user: Option<String>,
}

impl From<RayJob> for Row {
    fn from(job: RayJob) -> Self {
        let deployment_status = job.status.deployment_status();
        let (client_status, _) = map_to_client_status(&deployment_status);
        Row {
            user: job
                .metadata
                .annotations
                .get(annotation::LAUNCHED_BY_MACHINE_USER)
                .map(|value| UserHostRef::parse(value).user().to_string()),
            cluster: job.status.ray_cluster_name().map(str::to_string),
            started: job.status.start_time(),
            ended: job.status.end_time(),
            name: job.metadata.name,
            created: job.metadata.creation_timestamp,
            deployment_status: deployment_status.to_string(),
            client_status: client_status.to_string(),
        }
    }
}

// Each closure has its own type, the array needs a common function pointer type.
type Accessor = fn(&Row) -> Result<Option<String>>;

fn accessor(f: Accessor) -> Accessor {
    f
}

pub fn list(kubectl: &Kubectl, namespace: &str) -> Result<()> {
    let mut rows: Vec<Row> = kubectl
        .ray_jobs(namespace)?
        .into_iter()
        .map(Row::from)
        .collect();
    // Newest first, jobs without a timestamp last.
    rows.sort_by(|a, b| b.created.cmp(&a.created));

    fn format_time(value: Option<time::OffsetDateTime>) -> Result<Option<String>> {
        Ok(value.map(OffsetDateTimeExt::format_local).transpose()?)
    }

    let columns = [
        ("name".to_string(), accessor(|row| Ok(Some(row.name.clone())))),
        (
            format!("created ({})", time_ext::format_offset(time_ext::local_offset()?)?),
            accessor(|row| format_time(row.created)),
        ),
        ("started".to_string(), accessor(|row| format_time(row.started))),
        ("ended".to_string(), accessor(|row| format_time(row.ended))),
        (
            "deployment status".to_string(),
            accessor(|row| Ok(Some(row.deployment_status.clone()))),
        ),
        (
            "status".to_string(),
            accessor(|row| Ok(Some(row.client_status.clone()))),
        ),
        ("cluster".to_string(), accessor(|row| Ok(row.cluster.clone()))),
        ("launched by".to_string(), accessor(|row| Ok(row.user.clone()))),
    ];

    let (column_names, accessors): (Vec<_>, Vec<_>) = columns.into_iter().unzip();

    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            column_names
                .into_iter()
                .map(|name| Cell::new(name).add_attribute(Attribute::Bold)),
        );

    for row in rows {
        // `Table::add_row` does not accept results, collect first to surface formatting errors.
        table.add_row(
            accessors
                .iter()
                .map(|f| f(&row))
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .map(|value| value.unwrap_or_default()),
        );
    }

    println!("{table}");

    Ok(())
}
