//! Client for the Minecraft Pi / `RaspberryJuice` text protocol.
//!
//! Commands are single lines such as `world.getBlock(1,2,3)`. Queries answer
//! with one line; `setBlock` and `chat.post` answer with nothing unless the
//! server reports a failure, which is drained before the next command.

use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use craftbots_types::{ChatPost, Position};
use tracing::{debug, info, warn};

use crate::control::WorldControl;
use crate::error::WorldError;

/// Default game server port.
pub const DEFAULT_PORT: u16 = 4711;

/// A live connection to a game server.
#[derive(Debug)]
pub struct McpiConnection {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl McpiConnection {
    /// Connect to `host:port`. `timeout` bounds both the connect and every
    /// response read.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, WorldError> {
        let addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| WorldError::Protocol {
                command: "connect".to_owned(),
                response: format!("{host}:{port} did not resolve"),
            })?;
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;
        let reader = BufReader::new(stream.try_clone()?);
        info!(host, port, "connected to game server");
        Ok(Self {
            writer: stream,
            reader,
        })
    }

    /// Discard anything the server sent unprompted (typically `Fail`).
    fn drain(&mut self) -> Result<(), WorldError> {
        let buffered = self.reader.buffer().len();
        if buffered > 0 {
            self.reader.consume(buffered);
        }
        self.writer.set_nonblocking(true)?;
        let mut scratch = [0_u8; 1024];
        let result = loop {
            match self.reader.get_mut().read(&mut scratch) {
                Ok(0) => break Err(WorldError::Disconnected),
                Ok(n) => {
                    let text = String::from_utf8_lossy(scratch.get(..n).unwrap_or_default());
                    warn!(response = %text.trim(), "discarding unsolicited server output");
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break Ok(()),
                Err(e) => break Err(e.into()),
            }
        };
        self.writer.set_nonblocking(false)?;
        result
    }

    fn send(&mut self, command: &str) -> Result<(), WorldError> {
        self.drain()?;
        debug!(command, "mcpi send");
        self.writer.write_all(command.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn query(&mut self, command: &str) -> Result<String, WorldError> {
        self.send(command)?;
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(WorldError::Disconnected);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_owned())
    }
}

fn parse_number<T: core::str::FromStr>(command: &str, response: &str) -> Result<T, WorldError> {
    response.trim().parse().map_err(|_unparsed| WorldError::Protocol {
        command: command.to_owned(),
        response: response.to_owned(),
    })
}

/// Parse the `x,y,z` answer of `player.getTile()`.
fn parse_position(command: &str, response: &str) -> Result<Position, WorldError> {
    let mut parts = response.split(',');
    let mut next = || -> Result<i32, WorldError> {
        let part = parts.next().ok_or_else(|| WorldError::Protocol {
            command: command.to_owned(),
            response: response.to_owned(),
        })?;
        // Some servers answer with floats even for tile queries.
        let value: f64 = parse_number(command, part)?;
        let floored = value.floor();
        if !(f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(&floored) {
            return Err(WorldError::ArithmeticOverflow);
        }
        #[allow(clippy::cast_possible_truncation)]
        let tile = floored as i32;
        Ok(tile)
    };
    Ok(Position::new(next()?, next()?, next()?))
}

/// Parse the `id,message|id,message` answer of `events.chat.posts()`.
fn parse_chat_posts(response: &str) -> Vec<ChatPost> {
    response
        .split('|')
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| match entry.split_once(',') {
            Some((id, message)) => ChatPost {
                entity_id: id.trim().parse().ok(),
                message: message.to_owned(),
            },
            None => ChatPost {
                entity_id: None,
                message: entry.to_owned(),
            },
        })
        .collect()
}

/// Chat lines cannot carry newlines over this protocol.
fn sanitize_chat(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

impl WorldControl for McpiConnection {
    fn get_block(&mut self, pos: Position) -> Result<u16, WorldError> {
        let command = format!("world.getBlock({},{},{})", pos.x, pos.y, pos.z);
        let response = self.query(&command)?;
        parse_number(&command, &response)
    }

    fn set_block(&mut self, pos: Position, block: u16, data: Option<u8>) -> Result<(), WorldError> {
        let command = match data {
            Some(value) => format!("world.setBlock({},{},{},{block},{value})", pos.x, pos.y, pos.z),
            None => format!("world.setBlock({},{},{},{block})", pos.x, pos.y, pos.z),
        };
        self.send(&command)
    }

    fn get_height(&mut self, x: i32, z: i32) -> Result<i32, WorldError> {
        let command = format!("world.getHeight({x},{z})");
        let response = self.query(&command)?;
        parse_number(&command, &response)
    }

    fn player_position(&mut self) -> Result<Position, WorldError> {
        let command = "player.getTile()";
        let response = self.query(command)?;
        parse_position(command, &response)
    }

    fn post_chat(&mut self, text: &str) -> Result<(), WorldError> {
        self.send(&format!("chat.post({})", sanitize_chat(text)))
    }

    fn poll_chat(&mut self) -> Result<Vec<ChatPost>, WorldError> {
        let response = self.query("events.chat.posts()")?;
        Ok(parse_chat_posts(&response))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_tile_positions() {
        let p = parse_position("player.getTile()", "12,64,-7").unwrap();
        assert_eq!(p, Position::new(12, 64, -7));
        let p = parse_position("player.getTile()", "1.0,2.9,-0.5").unwrap();
        assert_eq!(p, Position::new(1, 2, -1));
        assert!(parse_position("player.getTile()", "1,2").is_err());
    }

    #[test]
    fn parses_chat_posts() {
        let posts = parse_chat_posts("1,-agent status|2,hi, there");
        assert_eq!(posts.len(), 2);
        assert_eq!(posts.first().unwrap().entity_id, Some(1));
        assert_eq!(posts.get(1).unwrap().message, "hi, there");
        assert!(parse_chat_posts("").is_empty());
    }

    #[test]
    fn chat_text_is_single_line() {
        assert_eq!(sanitize_chat("a\nb\r\nc"), "a b  c");
    }

    #[test]
    fn bad_integer_is_protocol_error() {
        let err = parse_number::<u16>("world.getBlock(0,0,0)", "Fail").unwrap_err();
        assert!(matches!(err, WorldError::Protocol { .. }));
    }
}
