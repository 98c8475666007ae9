use super::test_helpers::*;
use crate::config::{EntryConfig, VideoQuality};
use crate::error::{DownloadError, Error};
use crate::types::{EntryId, Event, StartOutcome, Status};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
