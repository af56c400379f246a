use handlebars::Handlebars;
use std::sync::Arc;

use crate::error::ConfigError;

pub type Hbs = Arc<Handlebars<'static>>;

const TEMPLATES: &[(&str, &str)] = &[
    ("layouts/base", "templates/layouts/base.hbs"),
    ("pages/add_bill", "templates/pages/add_bill.hbs"),
    ("pages/not_found", "templates/pages/not_found.hbs"),
];

pub fn build_handlebars() -> Result<Hbs, ConfigError> {
    let mut hb = Handlebars::new();

    for (name, path) in TEMPLATES {
        hb.register_template_file(*name, *path).map_err(Box::new)?;
    }

    Ok(Arc::new(hb))
}
