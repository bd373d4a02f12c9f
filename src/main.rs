// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::time::Instant;

use anyhow::{bail, Context};
use tracing_subscriber::{fmt, EnvFilter};

use schemaflow::config::{load_and_validate_config, RuntimeBuilder};
use schemaflow::dataflow::LifecycleKind;
use schemaflow::engine::Runtime;
use schemaflow::model::{Attributes, Path, Value};

/// Initialize logging. `RUST_LOG` overrides the default `info` filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <model.yaml> [--create <Namespace/Type> <json-attributes>]", program);
    eprintln!("Example: {} configs/bank.yaml", program);
    eprintln!(
        "Example: {} configs/bank.yaml --create Bank/Account '{{\"Email\": \"ada@example.com\", \"Balance\": 120}}'",
        program
    );
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("schemaflow");
    let (model, create) = match args.as_slice() {
        [_, model] => (model, None),
        [_, model, flag, record, json] if flag == "--create" => (model, Some((record, json))),
        _ => usage(program),
    };

    let start_time = Instant::now();
    let config = load_and_validate_config(model).with_context(|| format!("failed to load {}", model))?;
    let runtime = RuntimeBuilder::from_config(&config).with_context(|| format!("failed to build {}", model))?;

    println!("📋 Model: {}", model);
    println!("⏱️  Loaded in {:?}", start_time.elapsed());
    print_dataflows(&runtime);

    if let Some((record, json)) = create {
        create_instance(&runtime, record, json).await?;
    }
    Ok(())
}

/// Print every compiled dataflow, grouped by namespace.
fn print_dataflows(runtime: &Runtime) {
    let table = runtime.namespaces().snapshot();
    for name in table.namespace_names() {
        let Some(namespace) = table.namespace(name) else {
            continue;
        };
        if namespace.dataflow_count() == 0 {
            continue;
        }
        println!("\n📦 {} ({} dataflows)", name, namespace.dataflow_count());
        for dataflow in namespace.events.values().flatten() {
            if let Some(doc) = &dataflow.head.doc {
                println!("  # {}", doc);
            }
            match dataflow.opcode.get() {
                Some(compiled) => print!("{}", compiled),
                None => println!("  {} (not compiled)", dataflow.event),
            }
        }
    }
}

/// Create an instance through its resolver and report the upsert dataflows it
/// would trigger.
async fn create_instance(runtime: &Runtime, record: &str, json: &str) -> anyhow::Result<()> {
    let record = Path::parse(record);
    if !record.is_qualified() {
        bail!("record type '{}' must be written as Namespace/Type", record);
    }

    let attributes: Attributes = match serde_json::from_str::<serde_json::Value>(json)? {
        serde_json::Value::Object(map) => map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
        other => bail!("attributes must be a JSON object, got {}", other),
    };

    let instance = runtime.create(&record, attributes).await?;
    let rendered = serde_json::Value::from(&Value::Instance(Box::new(instance.clone())));
    println!("\n✅ Created {}", record);
    println!("{}", serde_json::to_string_pretty(&rendered)?);

    let (event, matched) = runtime.lifecycle_dataflows(&instance, LifecycleKind::OnUpsertAfter)?;
    println!("\n⚡ {} triggers {} dataflow(s)", event.path, matched.len());
    for dataflow in matched {
        println!("  - {}", dataflow.head.doc.as_deref().unwrap_or("(undocumented)"));
    }
    Ok(())
}
