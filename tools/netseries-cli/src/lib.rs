use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context as AnyhowContext, Result};
use netseries_core::preview::bezier_curve;
use netseries_core::{
    generate_with, synthesize, Boundary, Configuration, DependencyGraph, GenError,
    GenerateOptions, GeneratedSeries, ResolveOrder,
};
use serde::Serialize;
use tera::{Context, Tera};
use tracing::{debug, info};

const SUMMARY_TEMPLATE: &str = r#"# Generated dataset

- cycles: {{ n_cycles }}
- super nodes: {{ n_supernodes }}
- order: {{ order }}
- seed: {{ seed }}

| super node | kind | sub node | min | max | mean | file |
|---|---|---|---|---|---|---|
{% for row in rows %}| {{ row.supernode }} | {{ row.kind }} | {{ row.subnode }} | {{ row.min | round(precision=4) }} | {{ row.max | round(precision=4) }} | {{ row.mean | round(precision=4) }} | {{ row.file }} |
{% endfor %}"#;

const DOT_TEMPLATE: &str = r#"digraph netseries {
    rankdir=LR;
{% for node in nodes %}{% if subnodes %}    subgraph cluster_{{ node.id }} {
        label="Super Node {{ node.id }} ({{ node.kind }})";
{% for i in node.subnodes %}        sn{{ node.id }}_{{ i }} [label="Sub Node {{ i }}"];
{% endfor %}    }
{% else %}    sn{{ node.id }} [label="Super Node {{ node.id }}\n{{ node.kind }}", shape=box];
{% endif %}{% endfor %}{% for edge in edges %}    {{ edge.from }} -> {{ edge.to }};
{% endfor %}}
"#;

/// Options of the `generate` command
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub out_dir: PathBuf,
    pub seed: Option<u64>,
    pub order: ResolveOrder,
    pub json: bool,
}

/// Files written by a `generate` run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub csv_files: Vec<PathBuf>,
    pub json_file: Option<PathBuf>,
    pub summary_file: PathBuf,
}

#[derive(Serialize)]
struct SummaryRow {
    supernode: usize,
    kind: &'static str,
    subnode: usize,
    min: f64,
    max: f64,
    mean: f64,
    file: String,
}

#[derive(Serialize)]
struct NodeView {
    id: usize,
    kind: &'static str,
    subnodes: Vec<usize>,
}

#[derive(Serialize)]
struct EdgeView {
    from: String,
    to: String,
}

pub fn load_config(input: &Path) -> Result<Configuration> {
    let s = fs::read_to_string(input).with_context(|| format!("read {}", input.display()))?;
    let config = Configuration::from_yaml_str(&s).with_context(|| format!("load {}", input.display()))?;
    debug!(path = %input.display(), supernodes = config.supernodes.len(), "loaded configuration");
    Ok(config)
}

/// Generate a configuration and write one CSV per super node plus a summary
pub fn run_generate(input: &Path, opts: &RunOptions) -> Result<RunSummary> {
    let config = load_config(input)?;
    let options = GenerateOptions {
        order: opts.order,
        seed: opts.seed,
    };
    let series = generate_with(&config, &options)?;

    fs::create_dir_all(&opts.out_dir)
        .with_context(|| format!("create {}", opts.out_dir.display()))?;

    let mut csv_files = vec![];
    for id in series.ids() {
        let path = opts.out_dir.join(format!("supernode_{}.csv", id));
        let file = fs::File::create(&path).with_context(|| format!("create {}", path.display()))?;
        series
            .write_csv(id, std::io::BufWriter::new(file))
            .with_context(|| format!("write {}", path.display()))?;
        csv_files.push(path);
    }

    let json_file = if opts.json {
        let path = opts.out_dir.join("series.json");
        fs::write(&path, serde_json::to_vec_pretty(&series)?)
            .with_context(|| format!("write {}", path.display()))?;
        Some(path)
    } else {
        None
    };

    let summary = render_summary(&config, &series, opts)?;
    let summary_file = opts.out_dir.join("summary.md");
    fs::write(&summary_file, summary).with_context(|| format!("write {}", summary_file.display()))?;

    info!(
        files = csv_files.len(),
        out = %opts.out_dir.display(),
        "wrote generated series"
    );
    Ok(RunSummary {
        csv_files,
        json_file,
        summary_file,
    })
}

fn render_summary(config: &Configuration, series: &GeneratedSeries, opts: &RunOptions) -> Result<String> {
    let mut rows = vec![];
    for (id, stats) in series.stats() {
        let kind = config
            .supernodes
            .get(&id)
            .map(|s| s.kind.name())
            .unwrap_or("unknown");
        for (i, s) in stats.into_iter().enumerate() {
            rows.push(SummaryRow {
                supernode: id,
                kind,
                subnode: i,
                min: s.min,
                max: s.max,
                mean: s.mean,
                file: format!("supernode_{}.csv", id),
            });
        }
    }

    let mut ctx = Context::new();
    ctx.insert("n_cycles", &config.n_cycles);
    ctx.insert("n_supernodes", &config.supernodes.len());
    ctx.insert("order", order_name(opts.order));
    ctx.insert(
        "seed",
        &opts.seed.map(|s| s.to_string()).unwrap_or_else(|| "entropy".to_string()),
    );
    ctx.insert("rows", &rows);

    let mut tera = Tera::default();
    tera.add_raw_template("summary.md", SUMMARY_TEMPLATE)?;
    Ok(tera.render("summary.md", &ctx)?)
}

fn order_name(order: ResolveOrder) -> &'static str {
    match order {
        ResolveOrder::TwoPass => "two-pass",
        ResolveOrder::Topological => "topological",
    }
}

/// Load-time violations of a configuration file, empty when it is valid
pub fn validate_file(input: &Path) -> Result<Vec<String>> {
    let s = fs::read_to_string(input).with_context(|| format!("read {}", input.display()))?;
    match Configuration::from_yaml_str(&s) {
        Ok(_) => Ok(vec![]),
        Err(GenError::InvalidConfiguration(v)) => Ok(v),
        Err(e) => Err(e).with_context(|| format!("load {}", input.display())),
    }
}

/// Parse a comma separated list of numbers, e.g. `0.2,0.5,0.8`
pub fn parse_list(s: &str) -> Result<Vec<f64>> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<f64>().with_context(|| format!("not a number: '{}'", p)))
        .collect()
}

/// Parse `lower,upper`
pub fn parse_range(s: &str) -> Result<Boundary> {
    match parse_list(s)?.as_slice() {
        [lower, upper] if lower <= upper => Ok(Boundary::new(*lower, *upper)),
        [lower, upper] => bail!("range lower {} is above upper {}", lower, upper),
        other => Err(anyhow!("range needs two values, got {}", other.len())),
    }
}

/// Synthesize one series and format it as `cycle,value` CSV
pub fn synth_csv(points: &[f64], range: Boundary, samples: usize, noise: f64, seed: Option<u64>) -> Result<String> {
    let options = GenerateOptions {
        seed,
        ..GenerateOptions::default()
    };
    let series = synthesize(points, range, samples, noise, &mut options.rng())?;
    let mut out = String::from("cycle,value\n");
    for (i, v) in series.iter().enumerate() {
        out.push_str(&format!("{},{}\n", i, v));
    }
    Ok(out)
}

/// Bezier preview of control points as `x,y` CSV
pub fn preview_csv(points: &[f64], samples: usize) -> Result<String> {
    let mut out = String::from("x,y\n");
    for (x, y) in bezier_curve(points, samples)? {
        out.push_str(&format!("{},{}\n", x, y));
    }
    Ok(out)
}

/// Graphviz rendering of the super-node graph, or of the sub-node graph
/// clustered by super node.
pub fn render_dot(config: &Configuration, subnodes: bool) -> Result<String> {
    let graph = DependencyGraph::from_config(config);

    let nodes: Vec<NodeView> = config
        .supernodes
        .iter()
        .map(|(&id, spec)| NodeView {
            id,
            kind: spec.kind.name(),
            subnodes: (0..spec.n_subnodes).collect(),
        })
        .collect();

    let edges: Vec<EdgeView> = if subnodes {
        graph
            .subnode_edges()
            .map(|(from, to)| EdgeView {
                from: format!("sn{}_{}", from.supernode, from.index),
                to: format!("sn{}_{}", to.supernode, to.index),
            })
            .collect()
    } else {
        graph
            .edges()
            .map(|(from, to)| EdgeView {
                from: format!("sn{}", from),
                to: format!("sn{}", to),
            })
            .collect()
    };

    let mut ctx = Context::new();
    ctx.insert("nodes", &nodes);
    ctx.insert("edges", &edges);
    ctx.insert("subnodes", &subnodes);

    let mut tera = Tera::default();
    tera.add_raw_template("graph.dot", DOT_TEMPLATE)?;
    Ok(tera.render("graph.dot", &ctx)?)
}
