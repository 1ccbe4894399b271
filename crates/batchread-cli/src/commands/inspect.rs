//! `inspect`: show the descriptors a batch would get, without reading.

use batchread_core::{FileDescriptor, FileSummary, GroupId};

use crate::cli::{InspectArgs, OutputFormat};
use crate::commands::read::open_all;
use crate::error::CliResult;
use crate::output::render_files;

pub(crate) async fn handle_inspect(args: InspectArgs, format: OutputFormat) -> CliResult<()> {
    let files = open_all(&args.paths).await?;
    let group_id = GroupId::next();
    let summaries: Vec<FileSummary> = files
        .into_iter()
        .map(|file| FileDescriptor::intake(file, group_id).summary())
        .collect();
    render_files(&summaries, format)
}
