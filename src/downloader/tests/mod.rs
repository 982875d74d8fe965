use super::test_helpers::{create_test_downloader, media_server, track, wait_for_terminal};
use super::*;
use crate::error::{DownloadError, Error};
use crate::types::{JobStatus, MetadataPatch};
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

mod config_ops;
