use log::{debug, warn};
use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};

use crate::content_extractor::extract_plain_text;
use crate::email::Attachment;
use crate::error::ReportError;

/// Best-effort content of one message
#[derive(Debug, Default)]
pub struct DecodedBody {
    pub content: String,
    pub attachments: Vec<Attachment>,
    /// Parts that could not be decoded and were skipped
    pub warnings: Vec<ReportError>,
}

#[derive(Default)]
struct Collected {
    plain: Option<String>,
    html: Option<String>,
    attachments: Vec<Attachment>,
    warnings: Vec<ReportError>,
}

pub struct MimeDecoder;

impl MimeDecoder {
    /// Walk the MIME tree of a raw RFC 822 message
    ///
    /// The first inline `text/plain` part is the body; inline `text/html` is
    /// only used when the message has no plain text part. Attachments are
    /// reduced to their (decoded) filename. A malformed part is skipped and
    /// reported in `warnings`; decoding never fails as a whole.
    pub fn decode(raw: &[u8]) -> DecodedBody {
        debug!("Décodage d'un message de {} octets", raw.len());

        let Some(message) = MessageParser::default().parse(raw) else {
            warn!("⚠️  Structure du message illisible ({} octets)", raw.len());
            return DecodedBody {
                warnings: vec![ReportError::decode("message structure could not be parsed")],
                ..Default::default()
            };
        };

        let mut collected = Collected::default();
        if !message.parts.is_empty() {
            Self::walk(&message, 0, &mut collected);
        }

        let content = match (collected.plain, collected.html) {
            (Some(plain), _) => plain,
            (None, Some(html)) => html,
            (None, None) => String::new(),
        };

        debug!(
            "Corps décodé: {} caractères, {} pièce(s) jointe(s), {} avertissement(s)",
            content.len(),
            collected.attachments.len(),
            collected.warnings.len()
        );

        DecodedBody {
            content,
            attachments: collected.attachments,
            warnings: collected.warnings,
        }
    }

    fn walk(message: &Message<'_>, part_id: usize, collected: &mut Collected) {
        let Some(part) = message.parts.get(part_id) else {
            collected
                .warnings
                .push(ReportError::decode(format!("part {} referenced but missing", part_id)));
            return;
        };

        if let PartType::Multipart(children) = &part.body {
            for &child in children {
                // Children always come after their container
                if child > part_id {
                    Self::walk(message, child, collected);
                }
            }
            return;
        }

        // Attachments only contribute their name, even with a broken payload
        if Self::is_attachment(part) {
            let filename = part.attachment_name().unwrap_or_default().to_string();
            debug!("Pièce jointe trouvée: '{}'", filename);
            collected.attachments.push(Attachment::new(filename));
            return;
        }

        if part.is_encoding_problem {
            warn!("⚠️  Partie {} ignorée: contenu illisible", part_id);
            collected.warnings.push(ReportError::decode(format!(
                "part {} ({}) has an invalid transfer encoding",
                part_id,
                Self::mime_type(part)
            )));
            return;
        }

        match &part.body {
            PartType::Text(text) if Self::is_plain_text(part) => {
                if collected.plain.is_none() {
                    collected.plain = Some(text.trim().to_string());
                } else {
                    debug!("Partie text/plain supplémentaire {} ignorée", part_id);
                }
            }
            PartType::Html(html) => {
                let needs_html = collected.plain.is_none()
                    && collected.html.as_deref().map_or(true, str::is_empty);
                if needs_html {
                    collected.html = Some(extract_plain_text(html));
                }
            }
            PartType::Message(_) => {
                debug!("Message imbriqué {} non parcouru", part_id);
            }
            _ => {
                debug!("Partie inline {} ({}) ignorée", part_id, Self::mime_type(part));
            }
        }
    }

    fn is_attachment(part: &MessagePart<'_>) -> bool {
        part.content_disposition()
            .is_some_and(|d| d.ctype().eq_ignore_ascii_case("attachment"))
    }

    fn is_plain_text(part: &MessagePart<'_>) -> bool {
        match part.content_type() {
            None => true,
            Some(ct) => {
                ct.ctype().eq_ignore_ascii_case("text")
                    && ct.subtype().map_or(true, |s| s.eq_ignore_ascii_case("plain"))
            }
        }
    }

    fn mime_type(part: &MessagePart<'_>) -> String {
        match part.content_type() {
            Some(ct) => match ct.subtype() {
                Some(subtype) => format!("{}/{}", ct.ctype(), subtype),
                None => ct.ctype().to_string(),
            },
            None => "text/plain".to_string(),
        }
    }
}
