//! A minimal STOMP 1.2 frame codec: enough to connect, subscribe and receive messages
//!
//! See <https://stomp.github.io/stomp-specification-1.2.html>

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// A STOMP frame: a command, ordered headers and a (text) body
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    command: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl Frame {
    pub fn new<S: ToString>(command: S) -> Self {
        Self { command: command.to_string(), headers: Vec::new(), body: String::new() }
    }

    pub fn header<K: ToString, V: ToString>(mut self, key: K, value: V) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn body<S: ToString>(mut self, body: S) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn command(&self) -> &str  { &self.command }
    pub fn body_text(&self) -> &str { &self.body }

    /// The value of a header. When a header is repeated, the first occurrence wins
    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The `CONNECT` frame that opens a session
    pub fn connect(host: &str, token: &str, heartbeat: (Duration, Duration)) -> Self {
        Frame::new("CONNECT")
            .header("accept-version", "1.2,1.1,1.0")
            .header("host", host)
            .header("heart-beat", format!("{},{}", heartbeat.0.as_millis(), heartbeat.1.as_millis()))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn subscribe(id: &str, destination: &str, receipt: Option<&str>) -> Self {
        let frame = Frame::new("SUBSCRIBE")
            .header("id", id)
            .header("destination", destination)
            .header("ack", "auto");
        match receipt {
            Some(receipt) => frame.header("receipt", receipt),
            None => frame,
        }
    }

    pub fn disconnect() -> Self {
        Frame::new("DISCONNECT")
    }

    /// Serialize this frame, including the terminating NUL octet
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.command.len() + self.body.len() + 64);
        out.push_str(&self.command);
        out.push('\n');
        // CONNECT and CONNECTED headers are not escaped
        let escaped = self.command != "CONNECT" && self.command != "CONNECTED";
        for (key, value) in &self.headers {
            if escaped {
                out.push_str(&escape(key));
                out.push(':');
                out.push_str(&escape(value));
            } else {
                out.push_str(key);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if self.body.is_empty() == false {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse a single frame. A trailing NUL octet (and the EOLs that may follow it) is accepted but not required.
    ///
    /// Anything after the first frame is ignored, see [`parse_all`](Self::parse_all) for messages that carry several frames
    pub fn parse(text: &str) -> Result<Self, Box<dyn Error>> {
        let (frame, rest) = Self::parse_next(text)?;
        if Self::is_heartbeat(rest) == false {
            log::debug!("Ignoring {} bytes after a {} frame", rest.len(), frame.command);
        }
        Ok(frame)
    }

    /// Parse every frame of a transport message. Heart-beat EOLs between frames are skipped.
    ///
    /// Parsing stops at the first malformed frame, since its end cannot be told
    pub fn parse_all(text: &str) -> Vec<Result<Self, String>> {
        let mut frames = Vec::new();
        let mut rest = text;
        while Self::is_heartbeat(rest) == false {
            match Self::parse_next(rest) {
                Ok((frame, next)) => {
                    frames.push(Ok(frame));
                    rest = next;
                },
                Err(err) => {
                    frames.push(Err(err.to_string()));
                    break;
                },
            }
        }
        frames
    }

    /// Parse the frame at the start of `text`, and return it with what follows its NUL terminator
    fn parse_next(text: &str) -> Result<(Self, &str), Box<dyn Error>> {
        let text = text.trim_start_matches(|c| c == '\n' || c == '\r');
        let (head, body) = match text.find("\n\n") {
            Some(pos) => (&text[..pos], &text[pos + 2..]),
            None => match text.find("\r\n\r\n") {
                Some(pos) => (&text[..pos], &text[pos + 4..]),
                None => return Err("Missing end of headers in STOMP frame".into()),
            },
        };

        let mut lines = head.lines();
        let command = match lines.next().map(|l| l.trim_end_matches('\r')) {
            None | Some("") => return Err("Missing command in STOMP frame".into()),
            Some(command) => command.to_string(),
        };
        let escaped = command != "CONNECT" && command != "CONNECTED";

        let mut headers = Vec::new();
        for line in lines {
            let line = line.trim_end_matches('\r');
            let (key, value) = match line.split_once(':') {
                None => return Err(format!("Invalid STOMP header line {:?}", line).into()),
                Some(kv) => kv,
            };
            if escaped {
                headers.push((unescape(key)?, unescape(value)?));
            } else {
                headers.push((key.to_string(), value.to_string()));
            }
        }

        let frame = Self { command, headers, body: String::new() };
        let (body, rest) = match frame.get("content-length").map(|l| l.parse::<usize>()) {
            Some(Ok(len)) if len <= body.len() && body.is_char_boundary(len) => {
                let rest = &body[len..];
                (&body[..len], rest.strip_prefix('\0').unwrap_or(rest))
            },
            Some(Ok(len)) => return Err(format!("STOMP frame body is shorter than its content-length ({})", len).into()),
            Some(Err(err)) => return Err(format!("Invalid content-length: {}", err).into()),
            None => match body.find('\0') {
                Some(end) => (&body[..end], &body[end + 1..]),
                None => (body, ""),
            },
        };

        Ok((Self { body: body.to_string(), ..frame }, rest))
    }

    /// Whether a raw transport message is a heart-beat rather than a frame
    pub fn is_heartbeat(text: &str) -> bool {
        text.chars().all(|c| c == '\n' || c == '\r')
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command)?;
        if let Some(destination) = self.get("destination") {
            write!(f, " {}", destination)?;
        }
        Ok(())
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(s: &str) -> Result<String, Box<dyn Error>> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => return Err(format!("Invalid escape sequence \\{:?} in STOMP header", other).into()),
        }
    }
    Ok(out)
}

/// Compute the effective heart-beat periods, as `(outgoing, incoming)`.
///
/// `client` is what we offered in CONNECT, `server_header` the `heart-beat` header of CONNECTED.
/// A zero duration means "no heart-beat in this direction".
pub fn negotiate_heartbeat(client: (Duration, Duration), server_header: Option<&str>) -> (Duration, Duration) {
    let (server_send, server_want) = match server_header.and_then(parse_heartbeat) {
        Some(values) => values,
        None => return (Duration::from_millis(0), Duration::from_millis(0)),
    };
    let (client_send, client_want) = client;

    let outgoing = if client_send.as_millis() == 0 || server_want.as_millis() == 0 {
        Duration::from_millis(0)
    } else {
        client_send.max(server_want)
    };
    let incoming = if client_want.as_millis() == 0 || server_send.as_millis() == 0 {
        Duration::from_millis(0)
    } else {
        client_want.max(server_send)
    };
    (outgoing, incoming)
}

fn parse_heartbeat(value: &str) -> Option<(Duration, Duration)> {
    let (a, b) = value.trim().split_once(',')?;
    let a: u64 = a.trim().parse().ok()?;
    let b: u64 = b.trim().parse().ok()?;
    Some((Duration::from_millis(a), Duration::from_millis(b)))
}
