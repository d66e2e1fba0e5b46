//! CLI parse tests.

use super::{Cli, CliCommand};
use clap::Parser;

pub(super) fn parse(args: &[&str]) -> CliCommand {
    let cli = Cli::try_parse_from(args).unwrap();
    cli.command
}

#[test]
fn cli_parse_get_single() {
    match parse(&["hsched", "get", "https://example.com/"]) {
        CliCommand::Get {
            urls,
            no_cache,
            headers,
            head,
            data,
            output,
            json,
            ..
        } => {
            assert_eq!(urls, vec!["https://example.com/"]);
            assert!(!no_cache);
            assert!(headers.is_empty());
            assert!(!head);
            assert!(data.is_none());
            assert!(output.is_none());
            assert!(!json);
        }
        _ => panic!("expected Get"),
    }
}

#[test]
fn cli_parse_get_many_with_headers() {
    match parse(&[
        "hsched",
        "get",
        "http://a/",
        "http://b/",
        "-H",
        "Accept: text/plain",
        "--header",
        "X-Trace: 1",
        "--no-cache",
        "--raw",
        "--json",
    ]) {
        CliCommand::Get {
            urls,
            no_cache,
            raw,
            headers,
            json,
            ..
        } => {
            assert!(raw);
            assert_eq!(urls, vec!["http://a/", "http://b/"]);
            assert_eq!(headers, vec!["Accept: text/plain", "X-Trace: 1"]);
            assert!(no_cache);
            assert!(json);
        }
        _ => panic!("expected Get"),
    }
}

#[test]
fn cli_parse_get_post_data() {
    match parse(&[
        "hsched",
        "get",
        "http://a/",
        "--data",
        "k=v",
        "--content-type",
        "application/x-www-form-urlencoded",
        "-o",
        "/tmp/out",
    ]) {
        CliCommand::Get {
            data,
            content_type,
            output,
            ..
        } => {
            assert_eq!(data.as_deref(), Some("k=v"));
            assert_eq!(
                content_type.as_deref(),
                Some("application/x-www-form-urlencoded")
            );
            assert_eq!(output.as_deref(), Some(std::path::Path::new("/tmp/out")));
        }
        _ => panic!("expected Get"),
    }
}

#[test]
fn cli_get_requires_url() {
    assert!(Cli::try_parse_from(["hsched", "get"]).is_err());
}

#[test]
fn cli_head_conflicts_with_data() {
    assert!(Cli::try_parse_from(["hsched", "get", "http://a/", "--head", "--data", "x"]).is_err());
}

#[test]
fn cli_content_type_requires_data() {
    assert!(
        Cli::try_parse_from(["hsched", "get", "http://a/", "--content-type", "text/plain"])
            .is_err()
    );
}

#[test]
fn cli_parse_config() {
    assert!(matches!(parse(&["hsched", "config"]), CliCommand::Config));
}
