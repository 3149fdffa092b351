//! Tests for items and users.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::Path;

#[test]
fn cli_parse_items_defaults() {
    match parse(&["hnarc", "items"]) {
        CliCommand::Items {
            first,
            last,
            concurrency,
            out,
        } => {
            assert_eq!(first, 0);
            assert!(last.is_none());
            assert!(concurrency.is_none());
            assert_eq!(out, Path::new("."));
        }
        _ => panic!("expected Items"),
    }
}

#[test]
fn cli_parse_items_range() {
    match parse(&[
        "hnarc", "items", "--first", "100", "--last", "249", "-c", "4", "--out", "/data",
    ]) {
        CliCommand::Items {
            first,
            last,
            concurrency,
            out,
        } => {
            assert_eq!(first, 100);
            assert_eq!(last, Some(249));
            assert_eq!(concurrency, Some(4));
            assert_eq!(out, Path::new("/data"));
        }
        _ => panic!("expected Items with range"),
    }
}

#[test]
fn cli_parse_users() {
    match parse(&["hnarc", "users", "names.txt", "--concurrency", "2"]) {
        CliCommand::Users {
            file,
            concurrency,
            bundle,
            ..
        } => {
            assert_eq!(file, Path::new("names.txt"));
            assert_eq!(concurrency, Some(2));
            assert!(!bundle);
        }
        _ => panic!("expected Users"),
    }
}

#[test]
fn cli_parse_users_bundle() {
    match parse(&["hnarc", "users", "names.txt", "--bundle"]) {
        CliCommand::Users { bundle, .. } => assert!(bundle),
        _ => panic!("expected Users with --bundle"),
    }
}

#[test]
fn cli_parse_api_base_is_global() {
    let cli = Cli::try_parse_from(["hnarc", "items", "--api-base", "http://127.0.0.1:9/v0"]).unwrap();
    assert_eq!(cli.api_base.as_deref(), Some("http://127.0.0.1:9/v0"));
}

#[test]
fn cli_rejects_negative_first() {
    assert!(Cli::try_parse_from(["hnarc", "items", "--first", "-1"]).is_err());
}

#[test]
fn trailing_slash_added_once() {
    assert_eq!(crate::cli::with_trailing_slash("http://h/v0"), "http://h/v0/");
    assert_eq!(crate::cli::with_trailing_slash("http://h/v0/"), "http://h/v0/");
}
