//! `hsched get <url>...` – fetch URLs concurrently over the handle pool.

use anyhow::{bail, Context, Result};
use hsched_core::config::SchedulerConfig;
use hsched_core::{BodySource, Method, Request, Response, Scheduler};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct GetArgs {
    pub urls: Vec<String>,
    pub no_cache: bool,
    pub raw: bool,
    pub headers: Vec<String>,
    pub head: bool,
    pub data: Option<String>,
    pub content_type: Option<String>,
    pub output: Option<PathBuf>,
    pub json: bool,
}

/// One line of `--json` output.
#[derive(Debug, Serialize)]
struct Summary<'a> {
    url: &'a str,
    status: u32,
    connect_code: u32,
    error: Option<String>,
    headers: &'a [String],
    body_len: Option<usize>,
}

pub(crate) fn build_request(args: &GetArgs, url: &str) -> Request {
    let method = if args.head {
        Method::Head
    } else if args.data.is_some() {
        Method::Post
    } else {
        Method::Get
    };
    let mut req = Request::new(method, url)
        .no_cache(args.no_cache)
        .no_encoding(args.raw);
    for line in &args.headers {
        req = req.header(line.clone());
    }
    if let Some(data) = &args.data {
        req = req.with_body(BodySource::Buffer {
            data: data.clone().into_bytes(),
            content_type: args.content_type.clone(),
        });
    }
    req
}

pub fn run_get(cfg: &SchedulerConfig, args: GetArgs) -> Result<()> {
    if args.output.is_some() && args.urls.len() > 1 {
        bail!("--output takes a single URL");
    }
    let mut scheduler = Scheduler::initialize(cfg)?;

    // Submit everything first so the transfers overlap.
    let mut pending = Vec::with_capacity(args.urls.len());
    for url in &args.urls {
        let sink = match &args.output {
            Some(path) => Response::to_file(
                File::create(path).with_context(|| format!("create {}", path.display()))?,
            ),
            None => Response::buffered(),
        };
        pending.push((url, scheduler.submit(build_request(&args, url), sink)));
    }

    let mut failed = 0usize;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for (url, submitted) in pending {
        let res = match submitted {
            Ok(ticket) => scheduler.wait(ticket),
            Err(res) => res,
        };
        if let Err(e) = &res.result {
            failed += 1;
            tracing::warn!(url = %url, "request failed: {}", e);
        }
        if args.json {
            let summary = Summary {
                url,
                status: res.http_status,
                connect_code: res.connect_code,
                error: res.result.as_ref().err().map(|e| e.to_string()),
                headers: &res.headers,
                body_len: res.body_bytes().map(<[u8]>::len),
            };
            writeln!(out, "{}", serde_json::to_string(&summary)?)?;
        } else {
            print_response(&mut out, url, &res)?;
        }
    }
    out.flush()?;
    drop(out);
    scheduler.shutdown();

    if failed > 0 {
        bail!("{} of {} requests failed", failed, args.urls.len());
    }
    Ok(())
}

fn print_response(out: &mut impl Write, url: &str, res: &Response) -> Result<()> {
    writeln!(out, "== {}", url)?;
    match &res.result {
        Ok(()) => writeln!(out, "status: {}", res.http_status)?,
        Err(e) => writeln!(out, "error: {}", e)?,
    }
    for h in res.headers.iter().filter(|h| !h.is_empty()) {
        writeln!(out, "{}", h)?;
    }
    writeln!(out)?;
    if let Some(body) = res.body_bytes() {
        out.write_all(body)?;
        if !body.ends_with(b"\n") && !body.is_empty() {
            writeln!(out)?;
        }
    }
    Ok(())
}
