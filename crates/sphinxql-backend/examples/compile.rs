use std::env;

use sphinxql_backend::SphinxQueryCompiler;
use sphinxql_core::config::Config;
use sphinxql_core::query::{FieldFilter, QuerySpec};
use sphinxql_core::traits::QueryCompiler;

// Print the statement and bound parameters a query compiles to, without a daemon.
// Usage:
//   cargo run -p sphinxql-backend --example compile -- "free text" \
//     [--index NAME] [--filter field:kind:value]... [--sort [-]field]... [--offset N] [--limit N]
// The index name falls back to connections.default in sphinxql.toml, then "documents".

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut spec = QuerySpec::new();
    let mut index: Option<String> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--index" | "--filter" | "--sort" | "--offset" | "--limit" if i + 1 >= args.len() => {
                eprintln!("{} requires a value", args[i]); std::process::exit(2);
            }
            "--index" => { index = Some(args[i + 1].clone()); i += 2; continue; }
            "--filter" => {
                let parts: Vec<&str> = args[i + 1].splitn(3, ':').collect();
                if parts.len() != 3 { eprintln!("--filter expects field:kind:value"); std::process::exit(2); }
                spec.filters.push(FieldFilter::parse(parts[0], parts[1], parts[2])?);
                i += 2; continue;
            }
            "--sort" => { spec = spec.order_by(&args[i + 1]); i += 2; continue; }
            "--offset" => { spec = spec.offset(args[i + 1].parse()?); i += 2; continue; }
            "--limit" => { spec = spec.limit(args[i + 1].parse()?); i += 2; continue; }
            s if s.starts_with("--") => { eprintln!("Unknown flag: {}", s); std::process::exit(2); }
            s => {
                if spec.text.is_none() { spec.text = Some(s.to_string()); }
                i += 1; continue;
            }
        }
    }

    // Resolve index name precedence: flag > configured default connection > "documents"
    let index = match index {
        Some(name) => name,
        None => Config::load()
            .and_then(|c| c.connection("default"))
            .ok()
            .and_then(|o| o.index_name)
            .unwrap_or_else(|| "documents".to_string()),
    };

    let compiled = SphinxQueryCompiler::new(index)?.compile(&spec)?;
    println!("{}", compiled.statement);
    for (n, p) in compiled.params.iter().enumerate() {
        println!("  ${} = {:?}", n + 1, p);
    }
    Ok(())
}
