//! Plain-text tables for cluster and VM listings.
//!
//! Column widths are measured on the raw text and padding is applied before
//! coloring, so ANSI escapes never skew alignment.

use colored::{ColoredString, Colorize};

use evs_aws::ClusterInfo;
use evs_vcenter::VmSummary;

struct Column {
    header: &'static str,
    colored: bool,
}

struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                self.rows
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(col.header.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    fn render(&self) -> String {
        let widths = self.widths();
        let mut out = String::new();

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(col, w)| format!("{:<w$}", col.header, w = *w).bold().to_string())
            .collect();
        out.push_str(header.join("  ").trim_end());
        out.push('\n');

        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .zip(&self.columns)
                .zip(&widths)
                .map(|((cell, col), w)| {
                    let padded = format!("{:<w$}", cell, w = *w);
                    if col.colored {
                        paint_status(cell, padded).to_string()
                    } else {
                        padded
                    }
                })
                .collect();
            out.push_str(cells.join("  ").trim_end());
            out.push('\n');
        }
        out
    }
}

/// Colors a cell by the lifecycle state it names.
fn paint_status(state: &str, text: String) -> ColoredString {
    match state.to_ascii_uppercase().as_str() {
        "ACTIVE" | "CREATED" | "COMPLETED" | "POWERED_ON" => text.green(),
        "CREATING" | "DELETING" | "UPDATING" | "PENDING" | "IN_PROGRESS" | "SUSPENDED" => {
            text.yellow()
        }
        "FAILED" | "DELETED" | "POWERED_OFF" => text.red(),
        _ => text.normal(),
    }
}

pub fn cluster_table(clusters: &[ClusterInfo]) -> String {
    let mut table = Table::new(vec![
        Column { header: "NAME", colored: false },
        Column { header: "STATUS", colored: true },
        Column { header: "NODES", colored: false },
        Column { header: "REGION", colored: false },
        Column { header: "CLUSTER ID", colored: false },
    ]);
    for cluster in clusters {
        table.push(vec![
            cluster.name.clone(),
            cluster.status.clone(),
            cluster.node_count.to_string(),
            cluster.region.clone(),
            cluster.cluster_id.clone(),
        ]);
    }
    table.render()
}

pub fn vm_table(vms: &[VmSummary]) -> String {
    let mut table = Table::new(vec![
        Column { header: "NAME", colored: false },
        Column { header: "POWER", colored: true },
        Column { header: "GUEST OS", colored: false },
        Column { header: "VM ID", colored: false },
    ]);
    for vm in vms {
        table.push(vec![
            vm.name.clone(),
            vm.power_state.clone(),
            vm.guest_os.clone(),
            vm.vm_id.clone(),
        ]);
    }
    table.render()
}

/// `key: value` lines for a single cluster.
pub fn cluster_details(cluster: &ClusterInfo) -> String {
    let mut lines = vec![
        ("Name", cluster.name.clone()),
        ("Status", paint_status(&cluster.status, cluster.status.clone()).to_string()),
        ("Nodes", cluster.node_count.to_string()),
        ("Region", cluster.region.clone()),
    ];
    if let Some(created) = cluster.created_at {
        lines.push(("Created", created.to_rfc3339()));
    }
    if let Some(vpc) = &cluster.vpc_id {
        lines.push(("VPC", vpc.clone()));
    }
    if !cluster.subnet_ids.is_empty() {
        lines.push(("Subnets", cluster.subnet_ids.join(", ")));
    }

    lines
        .into_iter()
        .map(|(key, value)| format!("  {:<8} {}\n", format!("{}:", key), value))
        .collect()
}
