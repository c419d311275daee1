//! Iframe element description for embedding the widget.

use html_escape::encode_double_quoted_attribute as escape_attr;
use std::fmt;
use url::Url;

use crate::widget::types::{WidgetConfig, WidgetError};
use crate::widget::url::{generate_widget_url_with_base, DEFAULT_WIDGET_URL};

pub const DEFAULT_IFRAME_WIDTH: &str = "100%";
pub const DEFAULT_IFRAME_HEIGHT: &str = "488px";
pub const IFRAME_STYLE: &str = "border: none; border-radius: 12px;";

/// Layout options. Unset fields take the defaults above.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IframeOptions {
    pub width: Option<String>,
    pub height: Option<String>,
    pub class_name: Option<String>,
    pub id: Option<String>,
}

/// An `<iframe>` ready to be placed in a host page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetIframe {
    pub src: Url,
    pub width: String,
    pub height: String,
    pub class_name: Option<String>,
    pub id: Option<String>,
    pub style: &'static str,
}

impl WidgetIframe {
    pub fn new(config: &WidgetConfig, options: IframeOptions) -> Result<Self, WidgetError> {
        Self::with_base(DEFAULT_WIDGET_URL, config, options)
    }

    pub fn with_base(
        base: &str,
        config: &WidgetConfig,
        options: IframeOptions,
    ) -> Result<Self, WidgetError> {
        Ok(Self {
            src: generate_widget_url_with_base(base, config)?,
            width: non_empty(options.width).unwrap_or_else(|| DEFAULT_IFRAME_WIDTH.to_string()),
            height: non_empty(options.height).unwrap_or_else(|| DEFAULT_IFRAME_HEIGHT.to_string()),
            class_name: non_empty(options.class_name),
            id: non_empty(options.id),
            style: IFRAME_STYLE,
        })
    }

    pub fn to_html(&self) -> String {
        let mut html = format!("<iframe src=\"{}\"", escape_attr(self.src.as_str()));
        if let Some(id) = &self.id {
            html.push_str(&format!(" id=\"{}\"", escape_attr(id)));
        }
        if let Some(class_name) = &self.class_name {
            html.push_str(&format!(" class=\"{}\"", escape_attr(class_name)));
        }
        html.push_str(&format!(
            " width=\"{}\" height=\"{}\" style=\"{}\"></iframe>",
            escape_attr(&self.width),
            escape_attr(&self.height),
            self.style
        ));
        html
    }
}

impl fmt::Display for WidgetIframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_html())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
