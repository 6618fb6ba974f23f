/* This file is part of DarkFi (https://dark.fi)
 *
 * Copyright (C) 2020-2026 Dyne.org foundation
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! CBOR codec for [`PlutusData`], byte-compatible with the reference
//! serialization library used by wallets and indexers.
//!
//! Encoding rules:
//! * constructors 0..=6 use tags 121..=127, 7..=127 use tags 1280..=1400,
//!   anything above uses tag 102 over `[index, fields]`
//! * non-empty lists (and constructor fields) are indefinite-length,
//!   empty lists are the definite `0x80`
//! * maps are definite-length
//! * byte strings over 64 bytes are split into 64-byte indefinite chunks
//! * integers outside 64 bits use bignum tags 2 and 3
//!
//! Decoding accepts both definite and indefinite forms everywhere.

use num_bigint::{BigInt, Sign};
use num_traits::{Signed, ToPrimitive};

use super::PlutusData;
use crate::{Error, Result};

const MAJOR_UINT: u8 = 0;
const MAJOR_NINT: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;
const MAJOR_SIMPLE: u8 = 7;

const INDEFINITE: u8 = 31;
const BREAK: u8 = 0xff;

const TAG_POS_BIGNUM: u64 = 2;
const TAG_NEG_BIGNUM: u64 = 3;
const TAG_GENERAL_CONSTR: u64 = 102;

const BYTES_CHUNK: usize = 64;
const MAX_DEPTH: usize = 256;

/// Write a CBOR head with the shortest argument encoding.
fn write_head(buf: &mut Vec<u8>, major: u8, value: u64) {
    let m = major << 5;
    if value < 24 {
        buf.push(m | value as u8);
    } else if value <= u8::MAX as u64 {
        buf.push(m | 24);
        buf.push(value as u8);
    } else if value <= u16::MAX as u64 {
        buf.push(m | 25);
        buf.extend_from_slice(&(value as u16).to_be_bytes());
    } else if value <= u32::MAX as u64 {
        buf.push(m | 26);
        buf.extend_from_slice(&(value as u32).to_be_bytes());
    } else {
        buf.push(m | 27);
        buf.extend_from_slice(&value.to_be_bytes());
    }
}

/// Write a byte string, chunking it when longer than 64 bytes.
fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    if bytes.len() <= BYTES_CHUNK {
        write_head(buf, MAJOR_BYTES, bytes.len() as u64);
        buf.extend_from_slice(bytes);
        return
    }

    buf.push((MAJOR_BYTES << 5) | INDEFINITE);
    for chunk in bytes.chunks(BYTES_CHUNK) {
        write_head(buf, MAJOR_BYTES, chunk.len() as u64);
        buf.extend_from_slice(chunk);
    }
    buf.push(BREAK);
}

fn write_list(buf: &mut Vec<u8>, items: &[PlutusData]) {
    if items.is_empty() {
        write_head(buf, MAJOR_ARRAY, 0);
        return
    }

    buf.push((MAJOR_ARRAY << 5) | INDEFINITE);
    for item in items {
        write_data(buf, item);
    }
    buf.push(BREAK);
}

fn write_integer(buf: &mut Vec<u8>, i: &BigInt) {
    if let Some(v) = i.to_u64() {
        write_head(buf, MAJOR_UINT, v);
        return
    }

    // Negative n is carried as -1 - n
    let magnitude: BigInt = -i - 1;
    if i.is_negative() {
        if let Some(v) = magnitude.to_u64() {
            write_head(buf, MAJOR_NINT, v);
            return
        }
        write_head(buf, MAJOR_TAG, TAG_NEG_BIGNUM);
        write_bytes(buf, &magnitude.to_bytes_be().1);
    } else {
        write_head(buf, MAJOR_TAG, TAG_POS_BIGNUM);
        write_bytes(buf, &i.to_bytes_be().1);
    }
}

fn write_data(buf: &mut Vec<u8>, data: &PlutusData) {
    match data {
        PlutusData::Constr(index, fields) => {
            match index {
                0..=6 => write_head(buf, MAJOR_TAG, 121 + index),
                7..=127 => write_head(buf, MAJOR_TAG, 1280 + index - 7),
                _ => {
                    write_head(buf, MAJOR_TAG, TAG_GENERAL_CONSTR);
                    write_head(buf, MAJOR_ARRAY, 2);
                    write_head(buf, MAJOR_UINT, *index);
                }
            }
            write_list(buf, fields);
        }
        PlutusData::Map(entries) => {
            write_head(buf, MAJOR_MAP, entries.len() as u64);
            for (k, v) in entries {
                write_data(buf, k);
                write_data(buf, v);
            }
        }
        PlutusData::List(items) => write_list(buf, items),
        PlutusData::Integer(i) => write_integer(buf, i),
        PlutusData::Bytes(b) => write_bytes(buf, b),
    }
}

/// Encode a [`PlutusData`] value.
pub fn encode(data: &PlutusData) -> Vec<u8> {
    let mut buf = vec![];
    write_data(&mut buf, data);
    buf
}

/// Decode a [`PlutusData`] value, requiring the input to be fully consumed.
pub fn decode(bytes: &[u8]) -> Result<PlutusData> {
    let mut reader = Reader::new(bytes);
    let data = reader.data(0)?;
    if !reader.is_empty() {
        return Err(malformed(format!("{} trailing bytes", reader.remaining())))
    }
    Ok(data)
}

/// Wrap raw bytes in a single definite-length CBOR byte string, the
/// envelope used for serialized scripts.
pub fn wrap_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(bytes.len() + 9);
    write_head(&mut buf, MAJOR_BYTES, bytes.len() as u64);
    buf.extend_from_slice(bytes);
    buf
}

/// Strip one CBOR byte string envelope. Returns `None` unless the input
/// is exactly one byte string.
pub fn unwrap_bytes(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut reader = Reader::new(bytes);
    let inner = reader.bytes().ok()?;
    reader.is_empty().then_some(inner)
}

fn malformed<S: Into<String>>(msg: S) -> Error {
    Error::MalformedDatum(msg.into())
}

/// A decoded CBOR head. `arg` is `None` for indefinite-length items.
struct Head {
    major: u8,
    arg: Option<u64>,
}

/// Cursor over CBOR input.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    fn byte(&mut self) -> Result<u8> {
        let b = *self.bytes.get(self.pos).ok_or_else(|| malformed("unexpected end of input"))?;
        self.pos += 1;
        Ok(b)
    }

    fn peek(&self) -> Result<u8> {
        self.bytes.get(self.pos).copied().ok_or_else(|| malformed("unexpected end of input"))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(malformed("unexpected end of input"))
        }
        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn head(&mut self) -> Result<Head> {
        let initial = self.byte()?;
        let major = initial >> 5;
        let info = initial & 0x1f;
        let arg = match info {
            0..=23 => Some(info as u64),
            24 => Some(self.byte()? as u64),
            25 => Some(u16::from_be_bytes([self.byte()?, self.byte()?]) as u64),
            26 => {
                let b = self.take(4)?;
                Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as u64)
            }
            27 => {
                let b = self.take(8)?;
                let mut arr = [0u8; 8];
                arr.copy_from_slice(b);
                Some(u64::from_be_bytes(arr))
            }
            INDEFINITE => None,
            _ => return Err(malformed(format!("reserved additional info {info}"))),
        };
        Ok(Head { major, arg })
    }

    /// Consume a break marker if one is next.
    fn at_break(&mut self) -> Result<bool> {
        if self.peek()? == BREAK {
            self.pos += 1;
            return Ok(true)
        }
        Ok(false)
    }

    fn len_of(&self, arg: u64) -> Result<usize> {
        usize::try_from(arg).map_err(|_| malformed("length out of range"))
    }

    /// Read the payload of a byte string whose head was already consumed.
    fn bytes_body(&mut self, arg: Option<u64>) -> Result<Vec<u8>> {
        match arg {
            Some(len) => {
                let len = self.len_of(len)?;
                Ok(self.take(len)?.to_vec())
            }
            None => {
                let mut out = vec![];
                while !self.at_break()? {
                    let head = self.head()?;
                    match (head.major, head.arg) {
                        (MAJOR_BYTES, Some(len)) => {
                            let len = self.len_of(len)?;
                            out.extend_from_slice(self.take(len)?);
                        }
                        _ => return Err(malformed("invalid byte string chunk")),
                    }
                }
                Ok(out)
            }
        }
    }

    fn bytes(&mut self) -> Result<Vec<u8>> {
        let head = self.head()?;
        if head.major != MAJOR_BYTES {
            return Err(malformed("expected byte string"))
        }
        self.bytes_body(head.arg)
    }

    fn list_body(&mut self, arg: Option<u64>, depth: usize) -> Result<Vec<PlutusData>> {
        match arg {
            Some(len) => {
                let len = self.len_of(len)?;
                let mut items = Vec::with_capacity(len.min(self.remaining()));
                for _ in 0..len {
                    items.push(self.data(depth + 1)?);
                }
                Ok(items)
            }
            None => {
                let mut items = vec![];
                while !self.at_break()? {
                    items.push(self.data(depth + 1)?);
                }
                Ok(items)
            }
        }
    }

    fn list(&mut self, depth: usize) -> Result<Vec<PlutusData>> {
        let head = self.head()?;
        if head.major != MAJOR_ARRAY {
            return Err(malformed("expected constructor field list"))
        }
        self.list_body(head.arg, depth)
    }

    fn uint(&mut self) -> Result<u64> {
        match self.head()? {
            Head { major: MAJOR_UINT, arg: Some(v) } => Ok(v),
            _ => Err(malformed("expected unsigned integer")),
        }
    }

    fn data(&mut self, depth: usize) -> Result<PlutusData> {
        if depth > MAX_DEPTH {
            return Err(malformed("nesting too deep"))
        }

        let head = self.head()?;
        match (head.major, head.arg) {
            (MAJOR_UINT, Some(v)) => Ok(PlutusData::Integer(BigInt::from(v))),
            (MAJOR_NINT, Some(v)) => Ok(PlutusData::Integer(-BigInt::from(v) - 1)),
            (MAJOR_BYTES, arg) => Ok(PlutusData::Bytes(self.bytes_body(arg)?)),
            (MAJOR_TEXT, _) => Err(malformed("text strings are not plutus data")),
            (MAJOR_ARRAY, arg) => Ok(PlutusData::List(self.list_body(arg, depth)?)),
            (MAJOR_MAP, arg) => {
                let mut entries = vec![];
                match arg {
                    Some(len) => {
                        for _ in 0..self.len_of(len)? {
                            let k = self.data(depth + 1)?;
                            let v = self.data(depth + 1)?;
                            entries.push((k, v));
                        }
                    }
                    None => {
                        while !self.at_break()? {
                            let k = self.data(depth + 1)?;
                            let v = self.data(depth + 1)?;
                            entries.push((k, v));
                        }
                    }
                }
                Ok(PlutusData::Map(entries))
            }
            (MAJOR_TAG, Some(tag)) => self.tagged(tag, depth),
            (MAJOR_SIMPLE, _) => Err(malformed("simple values are not plutus data")),
            _ => Err(malformed("indefinite length not allowed here")),
        }
    }

    fn tagged(&mut self, tag: u64, depth: usize) -> Result<PlutusData> {
        match tag {
            121..=127 => Ok(PlutusData::Constr(tag - 121, self.list(depth)?)),
            1280..=1400 => Ok(PlutusData::Constr(tag - 1280 + 7, self.list(depth)?)),
            TAG_GENERAL_CONSTR => {
                match self.head()? {
                    Head { major: MAJOR_ARRAY, arg: Some(2) } => {}
                    _ => return Err(malformed("general constructor expects a pair")),
                }
                let index = self.uint()?;
                Ok(PlutusData::Constr(index, self.list(depth)?))
            }
            TAG_POS_BIGNUM => {
                let magnitude = self.bytes()?;
                Ok(PlutusData::Integer(BigInt::from_bytes_be(Sign::Plus, &magnitude)))
            }
            TAG_NEG_BIGNUM => {
                let magnitude = self.bytes()?;
                Ok(PlutusData::Integer(-BigInt::from_bytes_be(Sign::Plus, &magnitude) - 1))
            }
            _ => Err(malformed(format!("unknown tag {tag}"))),
        }
    }
}
