use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use mailscout_lib::{DiscoveryResult, ProviderStatus, Stage, ValidationResponse};

/// Where and how a report is written.
pub struct Sink<'a> {
    pub format: &'a str,
    pub out: Option<&'a Path>,
}

pub fn write_validation(rows: &[ValidationResponse], sink: &Sink<'_>, summary: bool) -> Result<()> {
    match sink.format {
        "human" => emit(sink, render_validation(rows, summary).as_bytes()),
        "json" => emit(sink, &to_json(rows)?),
        "ndjson" => emit(sink, &to_ndjson(rows)?),
        "csv" => write_csv(
            sink,
            &["email", "valid", "risk_score", "cached", "syntax", "dns", "smtp"],
            rows.iter().map(validation_record),
        ),
        other => bail!("unknown --format '{other}', use: human|json|ndjson|csv"),
    }
}

pub fn write_discovery(result: &DiscoveryResult, sink: &Sink<'_>) -> Result<()> {
    match sink.format {
        "human" => emit(sink, render_discovery(result).as_bytes()),
        "json" => emit(sink, &to_json(result)?),
        "ndjson" => emit(sink, &to_ndjson(&result.emails)?),
        "csv" => write_csv(
            sink,
            &["email", "source", "confidence", "found_at"],
            result.emails.iter().map(|c| {
                vec![
                    c.email.clone(),
                    c.source.method().to_string(),
                    format!("{:.2}", c.confidence),
                    c.found_at.clone().unwrap_or_default(),
                ]
            }),
        ),
        other => bail!("unknown --format '{other}', use: human|json|ndjson|csv"),
    }
}

pub fn write_providers(status: &[ProviderStatus], sink: &Sink<'_>) -> Result<()> {
    match sink.format {
        "human" => emit(sink, render_providers(status).as_bytes()),
        "json" => emit(sink, &to_json(status)?),
        "ndjson" => emit(sink, &to_ndjson(status)?),
        "csv" => write_csv(
            sink,
            &["method", "name", "available", "description"],
            status.iter().map(|p| {
                vec![
                    p.method.to_string(),
                    p.name.clone(),
                    p.available.to_string(),
                    p.description.clone(),
                ]
            }),
        ),
        other => bail!("unknown --format '{other}', use: human|json|ndjson|csv"),
    }
}

pub fn render_validation(rows: &[ValidationResponse], summary: bool) -> String {
    let mut s = String::new();
    for row in rows {
        let tag = if row.valid { "[VALID]  " } else { "[INVALID]" };
        let cached = if row.cached { " (cached)" } else { "" };
        let _ = writeln!(s, "{tag} {} risk={:.2}{cached}", row.email, row.risk_score);
        if summary {
            continue;
        }
        for result in row.validation_results.iter().flat_map(|m| m.values()) {
            let status = if result.valid { "ok" } else { "fail" };
            let _ = writeln!(s, "        {}: {status} :: {}", result.stage, result.message);
        }
    }
    s
}

pub fn render_discovery(result: &DiscoveryResult) -> String {
    let mut s = String::new();
    let methods: Vec<&str> = result.methods_used.iter().map(|m| m.as_str()).collect();
    let _ = writeln!(
        s,
        "{}: {} found via {}{}",
        result.domain,
        result.total_found,
        if methods.is_empty() { "-".to_string() } else { methods.join(", ") },
        if result.cached { " (cached)" } else { "" }
    );
    for c in &result.emails {
        let _ = write!(s, "  {:.2}  {:<32} {}", c.confidence, c.email, c.source.method());
        if let Some(url) = &c.found_at {
            let _ = write!(s, " @ {url}");
        }
        s.push('\n');
    }
    s
}

pub fn render_providers(status: &[ProviderStatus]) -> String {
    let mut s = String::new();
    for p in status {
        let state = if p.available { "available" } else { "unavailable" };
        let _ = writeln!(s, "{:<12} {:<18} {:<12} {}", p.method.as_str(), p.name, state, p.description);
    }
    s
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = serde_json::to_vec_pretty(value)?;
    buf.push(b'\n');
    Ok(buf)
}

fn to_ndjson<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for row in rows {
        serde_json::to_writer(&mut buf, row)?;
        buf.push(b'\n');
    }
    Ok(buf)
}

fn validation_record(row: &ValidationResponse) -> Vec<String> {
    let stage = |stage: Stage| {
        row.validation_results
            .as_ref()
            .and_then(|m| m.get(&stage))
            .map(|r| if r.valid { "ok".to_string() } else { format!("fail: {}", r.message) })
            .unwrap_or_default()
    };
    vec![
        row.email.clone(),
        row.valid.to_string(),
        format!("{:.2}", row.risk_score),
        row.cached.to_string(),
        stage(Stage::Syntax),
        stage(Stage::Dns),
        stage(Stage::Smtp),
    ]
}

#[cfg(feature = "with-csv")]
fn write_csv<I>(sink: &Sink<'_>, header: &[&str], records: I) -> Result<()>
where
    I: Iterator<Item = Vec<String>>,
{
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(header)?;
    for record in records {
        wtr.write_record(&record)?;
    }
    let data = wtr.into_inner().context("flush csv writer")?;
    emit(sink, &data)
}

#[cfg(not(feature = "with-csv"))]
fn write_csv<I>(_: &Sink<'_>, _: &[&str], _: I) -> Result<()>
where
    I: Iterator<Item = Vec<String>>,
{
    bail!("format=csv requires the 'with-csv' feature")
}

fn emit(sink: &Sink<'_>, bytes: &[u8]) -> Result<()> {
    match sink.out {
        Some(path) => write_all_atomically(path, bytes),
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
            Ok(())
        }
    }
}

fn write_all_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    use std::io::Write;

    let tmp = path.with_extension("tmp");
    {
        let mut f = std::fs::File::create(&tmp)
            .with_context(|| format!("create {}", tmp.display()))?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
