//! Response Harvester: extracts the replies produced after the last separator.

use std::sync::Arc;

use superai_browser::{scoped, DomNode, Page};
use superai_core::{AutomationConfig, Envelope, Error, ErrorLog, ReplyData, Result};
use tracing::{debug, info};

use crate::session::{ChatMode, Session};

const COMPONENT: &str = "getNewResponses";

/// A reply node, classified by what it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyBlock {
    Code(String),
    OrderedList { start: i64, items: Vec<String> },
    UnorderedList(Vec<String>),
    Text(String),
}

impl ReplyBlock {
    /// Classify by structure: code beats ordered lists beats unordered lists
    /// beats plain text. Empty text yields `None`.
    pub fn classify(node: &DomNode) -> Option<Self> {
        if let Some(code) = node.find_nested("pre", "code") {
            return Some(ReplyBlock::Code(code.text.trim().to_string()));
        }

        let ordered = node.find_child_of("ol", "li");
        if !ordered.is_empty() {
            let list = if node.tag == "ol" { Some(node) } else { node.find("ol") };
            let start = list
                .and_then(|ol| ol.attr("start"))
                .and_then(|s| s.trim().parse::<i64>().ok())
                .unwrap_or(1);
            return Some(ReplyBlock::OrderedList {
                start,
                items: ordered.iter().map(|li| li.text.trim().to_string()).collect(),
            });
        }

        let unordered = node.find_child_of("ul", "li");
        if !unordered.is_empty() {
            return Some(ReplyBlock::UnorderedList(
                unordered.iter().map(|li| li.text.trim().to_string()).collect(),
            ));
        }

        let text = node.text.trim();
        (!text.is_empty()).then(|| ReplyBlock::Text(text.to_string()))
    }

    pub fn render(&self) -> String {
        match self {
            ReplyBlock::Code(code) => format!("```\n{}\n```", code),
            ReplyBlock::OrderedList { start, items } => items
                .iter()
                .enumerate()
                .map(|(i, item)| format!("{}. {}", start.saturating_add(i as i64), item))
                .collect::<Vec<_>>()
                .join("\n"),
            ReplyBlock::UnorderedList(items) => items
                .iter()
                .map(|item| format!("- {}", item))
                .collect::<Vec<_>>()
                .join("\n"),
            ReplyBlock::Text(text) => text.clone(),
        }
    }
}

/// The slice of `nodes` that belongs to the latest exchange.
///
/// Everything strictly after the last node containing `marker`. Without any
/// separator, a resumed thread cuts at its baseline and a new thread keeps all.
pub fn new_replies<'a>(nodes: &'a [DomNode], marker: &str, session: &Session) -> &'a [DomNode] {
    match nodes.iter().rposition(|n| n.text.contains(marker)) {
        Some(last) => &nodes[last + 1..],
        None => match session.mode {
            ChatMode::Recent => &nodes[session.baseline_reply_count.min(nodes.len())..],
            ChatMode::New => nodes,
        },
    }
}

/// Client-local (`blob:`) image sources inside `nodes`.
pub fn blob_images(nodes: &[DomNode]) -> Vec<String> {
    nodes
        .iter()
        .flat_map(|n| n.find_all("img"))
        .filter_map(|img| img.attr("src"))
        .filter(|src| src.starts_with("blob:"))
        .map(str::to_string)
        .collect()
}

pub struct ResponseHarvester {
    config: Arc<AutomationConfig>,
    log: ErrorLog,
}

impl ResponseHarvester {
    pub fn new(config: Arc<AutomationConfig>, log: ErrorLog) -> Self {
        Self { config, log }
    }

    pub async fn harvest(&self, page: &dyn Page, session: &Session, last_message_sent: &str) -> Envelope {
        let model = match self.active_model(page).await {
            Ok(model) => model,
            Err(e) => return self.failed(&e, last_message_sent),
        };

        let sel = &self.config.selectors;
        let nodes = match page
            .snapshot_all(&scoped(&sel.reply_container, &sel.reply_item))
            .await
        {
            Ok(nodes) => nodes,
            Err(e) => return self.failed(&e.into(), last_message_sent),
        };

        let fresh = new_replies(&nodes, &self.config.separator.marker, session);
        debug!("{} of {} reply nodes are new", fresh.len(), nodes.len());

        let texts: Vec<String> = fresh
            .iter()
            .filter_map(ReplyBlock::classify)
            .map(|block| block.render())
            .collect();
        let images = blob_images(fresh);

        // The reply is still worth returning when the label is unreadable.
        let Some(model) = model else {
            let err = Error::ModelUnidentified;
            self.log.record(
                COMPONENT,
                &err.to_string(),
                Some(&format!("{} texts, {} images harvested", texts.len(), images.len())),
            );
            return Envelope::from_error(None, &err)
                .with_prompt(last_message_sent)
                .with_data(ReplyData {
                    model: String::new(),
                    texts,
                    images,
                });
        };

        if texts.is_empty() && images.is_empty() {
            return Envelope::from_error(None, &Error::NoNewContent)
                .with_prompt(last_message_sent)
                .with_data(ReplyData::model_only(model));
        }

        info!("Harvested {} texts, {} images from {}", texts.len(), images.len(), model);
        Envelope::ok("New responses retrieved")
            .with_prompt(last_message_sent)
            .with_data(ReplyData {
                model,
                texts,
                images,
            })
    }

    /// Visible label of the dropdown trigger, if readable.
    async fn active_model(&self, page: &dyn Page) -> Result<Option<String>> {
        let Some(trigger) = page.query(&self.config.selectors.model_trigger).await? else {
            return Ok(None);
        };
        let text = page.inner_text(&trigger).await?;
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }

    fn failed(&self, err: &Error, last_message_sent: &str) -> Envelope {
        self.log.record(COMPONENT, &err.to_string(), Some(&format!("{:?}", err)));
        Envelope::from_error(Some("Error retrieving responses"), err).with_prompt(last_message_sent)
    }
}
