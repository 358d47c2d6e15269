use crate::plan::CustomExportProfile;
use crate::report::ReportRow;
use anyhow::{Context, Result};
use std::fs;
use tracing::error;

pub fn render(report_name: &str, rows: &[ReportRow], params: &CustomExportProfile) -> Result<String> {
    let mut handlebars = crate::common::get_handlebars();

    if let Some(partials) = &params.partials {
        for (name, partial) in partials {
            let partial_content = fs::read_to_string(partial)
                .with_context(|| format!("Failed to read partial {}", partial))?;

            if let Err(err) = handlebars.register_partial(name, partial_content) {
                error!("Failed to register partial: {}", err);
            }
        }
    }

    let template = fs::read_to_string(&params.template)
        .with_context(|| format!("Failed to read template {}", params.template))?;
    let context = super::renderer::create_standard_context(report_name, rows);

    Ok(handlebars.render_template(&template, &context)?)
}
