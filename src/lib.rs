/*!
# Escudo Pyme

A browser dashboard for monitoring document-fraud verdicts, built in Rust.

## Overview

An upstream analysis workflow appends one row per analysed document (date,
issuer, amount, verdict, analysis, confidence) to a spreadsheet published as
CSV. This crate fetches that feed, normalizes whatever shape it arrives in,
derives the headline figures and serves a single self-refreshing page with
four metric tiles, a per-day history chart, a verdict ring chart and a
colour-coded, sortable detail table.

## Architecture

### Feed Layer
- **Technologies**: reqwest, csv
- **Key Components**:
  - Feed Source - HTTP(S) or local file behind one async trait
  - TTL Cache - Reuses a successful fetch for a short window
  - Loader - Tolerant CSV parsing and column backfill

### Analysis Layer
- Coercion - Amount and date parsing that never fails a row
- Metrics - Totals, threats, protected capital, verified count
- Breakdown - Per-day verdict counts and verdict proportions
- Style - Verdict colours and display formatting

### Presentation Layer
- **Technologies**: axum, handlebars, plotters
- Render model - Either a warning state or a full report
- Charts - Server-side SVG
- Exports - CSV and XLSX downloads of the current table

## Modules

- **config**: Command line and environment settings
- **error**: Feed error type
- **feed**: Feed sources and the caching loader
- **cache**: Time-bounded key/value cache
- **loader**: CSV parsing and normalization
- **coerce**: Amount and date parsing
- **record**: Records, columns and table ordering
- **metrics**: Aggregates over a table
- **style**: Colours and number/date formatting
- **graph**: SVG chart generation
- **dashboard**: One fetch-normalize-present cycle
- **downloader**: Export functionality (CSV, XLSX)
- **app**: Routing and middleware

## REST API Endpoints

- `/` - The dashboard page (`?sort=<column>&order=<asc|desc>`)
- `/api/dashboard` - Same render model as JSON
- `/export/registros.csv`, `/export/registros.xlsx` - Current table download
- `/healthz` - Liveness probe
*/

pub mod app;
pub mod cache;
pub mod coerce;
pub mod config;
pub mod dashboard;
pub mod downloader;
pub mod error;
pub mod feed;
pub mod graph;
pub mod loader;
pub mod metrics;
pub mod record;
pub mod style;

pub use dashboard::{Dashboard, RenderModel};
pub use error::FeedError;
pub use record::{Column, Record, SortOrder, Table, TableSort};
