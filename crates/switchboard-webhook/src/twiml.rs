//! TwiML generation for [`NextAction`] values.
//!
//! Uses `quick-xml`'s writer API. URLs handed to the telephony provider
//! (speech callbacks, audio clips) are absolute, built from the configured
//! public base URL.

use std::io::{self, Cursor};

use axum::{
  http::header,
  response::{IntoResponse, Response},
};
use quick_xml::{
  Writer,
  events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use switchboard_core::{NextAction, audio::AudioRef};

/// Canned document served when a response cannot be rendered.
pub const FALLBACK: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
  <Response><Say>We're sorry, an application error has occurred. Goodbye.</Say>\
  <Hangup/></Response>";

/// A rendered TwiML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Twiml(pub String);

impl IntoResponse for Twiml {
  fn into_response(self) -> Response {
    ([(header::CONTENT_TYPE, "application/xml")], self.0).into_response()
  }
}

/// Public URLs the rendered documents point back at.
#[derive(Debug, Clone)]
pub struct Urls {
  base: String,
}

impl Urls {
  pub fn new(base_url: &str) -> Self {
    Self { base: base_url.trim_end_matches('/').to_owned() }
  }

  pub fn speech(&self) -> String { format!("{}/voice/speech", self.base) }

  pub fn audio(&self, audio: &AudioRef) -> String {
    format!("{}/audio/{}", self.base, audio)
  }
}

/// Render `action` as a complete TwiML document.
///
/// Gathering actions are followed by a redirect back to the speech webhook,
/// so a caller who stays silent is handled as an empty utterance.
pub fn render(action: &NextAction, urls: &Urls) -> io::Result<Twiml> {
  let mut w = Writer::new(Cursor::new(Vec::new()));
  w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

  if matches!(action, NextAction::AckOnly) {
    w.write_event(Event::Empty(BytesStart::new("Response")))?;
    return finish(w);
  }

  write_start(&mut w, BytesStart::new("Response"))?;
  match action {
    NextAction::PlayThenGather(audio) => {
      write_gather(&mut w, urls, "Play", &urls.audio(audio))?;
      write_redirect(&mut w, urls)?;
    }
    NextAction::SayThenGather(text) => {
      write_gather(&mut w, urls, "Say", text)?;
      write_redirect(&mut w, urls)?;
    }
    NextAction::SayAndEnd(text) => {
      write_text_elem(&mut w, "Say", text)?;
      w.write_event(Event::Empty(BytesStart::new("Hangup")))?;
    }
    NextAction::TransferToHuman(address) => {
      write_text_elem(&mut w, "Dial", address)?;
    }
    NextAction::AckOnly => {}
  }
  w.write_event(Event::End(BytesEnd::new("Response")))?;
  finish(w)
}

// ─── XML writer helpers ──────────────────────────────────────────────────────

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn finish(w: XmlWriter) -> io::Result<Twiml> {
  String::from_utf8(w.into_inner().into_inner())
    .map(Twiml)
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn write_start(w: &mut XmlWriter, start: BytesStart<'_>) -> io::Result<()> {
  w.write_event(Event::Start(start))
}

fn write_text_elem(w: &mut XmlWriter, tag: &str, text: &str) -> io::Result<()> {
  w.write_event(Event::Start(BytesStart::new(tag)))?;
  w.write_event(Event::Text(BytesText::new(text)))?;
  w.write_event(Event::End(BytesEnd::new(tag)))
}

fn write_gather(w: &mut XmlWriter, urls: &Urls, verb: &str, body: &str) -> io::Result<()> {
  let action = urls.speech();
  let mut gather = BytesStart::new("Gather");
  gather.push_attribute(("input", "speech"));
  gather.push_attribute(("action", action.as_str()));
  gather.push_attribute(("method", "POST"));
  gather.push_attribute(("speechTimeout", "auto"));
  write_start(w, gather)?;
  write_text_elem(w, verb, body)?;
  w.write_event(Event::End(BytesEnd::new("Gather")))
}

fn write_redirect(w: &mut XmlWriter, urls: &Urls) -> io::Result<()> {
  let mut redirect = BytesStart::new("Redirect");
  redirect.push_attribute(("method", "POST"));
  write_start(w, redirect)?;
  w.write_event(Event::Text(BytesText::new(&urls.speech())))?;
  w.write_event(Event::End(BytesEnd::new("Redirect")))
}
