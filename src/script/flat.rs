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

//! Bit-level reader and writer for flat-encoded UPLC programs, and the
//! parameter application that turns a compiled template into a concrete
//! script.
//!
//! Applying parameters never interprets the program body. The term is
//! walked only to find where it ends; its bits are then copied verbatim
//! behind one `Apply` tag per parameter and followed by the parameters as
//! `Data` constants.

use crate::{
    plutus::{cbor, PlutusData},
    Error, Result,
};

const TERM_TAG_BITS: usize = 4;
const CONST_TAG_BITS: usize = 4;
const BUILTIN_TAG_BITS: usize = 7;

const TERM_VAR: u8 = 0;
const TERM_DELAY: u8 = 1;
const TERM_LAMBDA: u8 = 2;
const TERM_APPLY: u8 = 3;
const TERM_CONSTANT: u8 = 4;
const TERM_FORCE: u8 = 5;
const TERM_ERROR: u8 = 6;
const TERM_BUILTIN: u8 = 7;
const TERM_CONSTR: u8 = 8;
const TERM_CASE: u8 = 9;

const TYPE_INTEGER: u8 = 0;
const TYPE_BYTESTRING: u8 = 1;
const TYPE_STRING: u8 = 2;
const TYPE_UNIT: u8 = 3;
const TYPE_BOOL: u8 = 4;
const TYPE_LIST: u8 = 5;
const TYPE_PAIR: u8 = 6;
const TYPE_APPLY: u8 = 7;
const TYPE_DATA: u8 = 8;

const MAX_DEPTH: usize = 4096;

fn invalid<S: Into<String>>(msg: S) -> Error {
    Error::InvalidTemplate(msg.into())
}

/// Reads a byte slice MSB first, one bit at a time.
pub struct BitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Current offset in bits.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_aligned(&self) -> bool {
        self.pos % 8 == 0
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len() * 8
    }

    pub fn bit(&mut self) -> Result<bool> {
        let byte = self.bytes.get(self.pos / 8).ok_or_else(|| invalid("program truncated"))?;
        let bit = (byte >> (7 - self.pos % 8)) & 1 == 1;
        self.pos += 1;
        Ok(bit)
    }

    /// Read `n <= 8` bits as an unsigned value.
    pub fn bits8(&mut self, n: usize) -> Result<u8> {
        let mut value = 0u8;
        for _ in 0..n {
            value = (value << 1) | self.bit()? as u8;
        }
        Ok(value)
    }

    /// Variable-length natural: 7-bit groups, least significant first,
    /// each preceded by a continuation bit.
    pub fn natural(&mut self) -> Result<u64> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let group = self.bits8(8)?;
            if shift >= 64 || (shift > 57 && (group & 0x7f) >> (64 - shift) != 0) {
                return Err(invalid("natural exceeds 64 bits"))
            }
            value |= ((group & 0x7f) as u64) << shift;
            if group & 0x80 == 0 {
                return Ok(value)
            }
            shift += 7;
        }
    }

    /// Skip a natural of any size, as used by integer constants.
    fn skip_natural(&mut self) -> Result<()> {
        while self.bits8(8)? & 0x80 != 0 {}
        Ok(())
    }

    /// Padding of zero bits terminated by a one, ending on a byte boundary.
    pub fn filler(&mut self) -> Result<()> {
        while !self.bit()? {}
        if !self.is_aligned() {
            return Err(invalid("filler does not end on a byte boundary"))
        }
        Ok(())
    }

    /// Skip a byte string: filler, then length-prefixed chunks ending in an
    /// empty chunk.
    fn skip_bytestring(&mut self) -> Result<()> {
        self.filler()?;
        loop {
            let len = self.bits8(8)? as usize;
            if len == 0 {
                return Ok(())
            }
            let end = self.pos + len * 8;
            if end > self.bytes.len() * 8 {
                return Err(invalid("byte string truncated"))
            }
            self.pos = end;
        }
    }
}

/// Accumulates bits MSB first.
#[derive(Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    current: u8,
    used: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bit(&mut self, bit: bool) {
        if bit {
            self.current |= 0x80 >> self.used;
        }
        self.used += 1;
        if self.used == 8 {
            self.bytes.push(self.current);
            self.current = 0;
            self.used = 0;
        }
    }

    /// Write the low `n <= 8` bits of `value`.
    pub fn bits8(&mut self, n: usize, value: u8) {
        for i in (0..n).rev() {
            self.bit((value >> i) & 1 == 1);
        }
    }

    pub fn natural(&mut self, mut value: u64) {
        loop {
            let mut group = (value & 0x7f) as u8;
            value >>= 7;
            if value != 0 {
                group |= 0x80;
            }
            self.bits8(8, group);
            if value == 0 {
                return
            }
        }
    }

    pub fn filler(&mut self) {
        while self.used != 7 {
            self.bit(false);
        }
        self.bit(true);
    }

    pub fn bytestring(&mut self, bytes: &[u8]) {
        self.filler();
        for chunk in bytes.chunks(255) {
            self.bytes.push(chunk.len() as u8);
            self.bytes.extend_from_slice(chunk);
        }
        self.bytes.push(0);
    }

    /// Copy the bit range `[start, end)` of `src`.
    pub fn copy_bits(&mut self, src: &[u8], start: usize, end: usize) {
        for pos in start..end {
            self.bit((src[pos / 8] >> (7 - pos % 8)) & 1 == 1);
        }
    }

    /// A `Data` constant term holding the CBOR encoding of `data`.
    pub fn data_constant(&mut self, data: &PlutusData) {
        self.bits8(TERM_TAG_BITS, TERM_CONSTANT);
        // Type tag list: [data]
        self.bit(true);
        self.bits8(CONST_TAG_BITS, TYPE_DATA);
        self.bit(false);
        self.bytestring(&data.to_cbor());
    }

    /// Finish, requiring the stream to end on a byte boundary.
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.used != 0 {
            return Err(invalid("program does not end on a byte boundary"))
        }
        Ok(self.bytes)
    }
}

/// Constant types as they appear in the type tag list.
enum ConstType {
    Integer,
    ByteString,
    String,
    Unit,
    Bool,
    Data,
    List(Box<ConstType>),
    Pair(Box<ConstType>, Box<ConstType>),
}

fn parse_type(tags: &mut impl Iterator<Item = u8>) -> Result<ConstType> {
    let tag = tags.next().ok_or_else(|| invalid("empty constant type"))?;
    let ty = match tag {
        TYPE_INTEGER => ConstType::Integer,
        TYPE_BYTESTRING => ConstType::ByteString,
        TYPE_STRING => ConstType::String,
        TYPE_UNIT => ConstType::Unit,
        TYPE_BOOL => ConstType::Bool,
        TYPE_DATA => ConstType::Data,
        TYPE_APPLY => match tags.next() {
            Some(TYPE_LIST) => ConstType::List(Box::new(parse_type(tags)?)),
            Some(TYPE_APPLY) => {
                if tags.next() != Some(TYPE_PAIR) {
                    return Err(invalid("malformed pair type"))
                }
                let fst = parse_type(tags)?;
                let snd = parse_type(tags)?;
                ConstType::Pair(Box::new(fst), Box::new(snd))
            }
            _ => return Err(invalid("malformed type application")),
        },
        t => return Err(invalid(format!("unsupported constant type {t}"))),
    };
    Ok(ty)
}

fn skip_list<F>(r: &mut BitReader, mut item: F) -> Result<()>
where
    F: FnMut(&mut BitReader) -> Result<()>,
{
    while r.bit()? {
        item(r)?;
    }
    Ok(())
}

fn skip_value(r: &mut BitReader, ty: &ConstType) -> Result<()> {
    match ty {
        ConstType::Integer => r.skip_natural(),
        ConstType::ByteString | ConstType::String | ConstType::Data => r.skip_bytestring(),
        ConstType::Unit => Ok(()),
        ConstType::Bool => r.bit().map(|_| ()),
        ConstType::List(inner) => skip_list(r, |r| skip_value(r, inner)),
        ConstType::Pair(fst, snd) => {
            skip_value(r, fst)?;
            skip_value(r, snd)
        }
    }
}

fn skip_constant(r: &mut BitReader) -> Result<()> {
    let mut tags = vec![];
    while r.bit()? {
        tags.push(r.bits8(CONST_TAG_BITS)?);
    }
    let mut iter = tags.into_iter();
    let ty = parse_type(&mut iter)?;
    if iter.next().is_some() {
        return Err(invalid("trailing constant type tags"))
    }
    skip_value(r, &ty)
}

/// Advance the reader past one de Bruijn-indexed term.
pub fn skip_term(r: &mut BitReader, depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(invalid("term nesting too deep"))
    }

    match r.bits8(TERM_TAG_BITS)? {
        TERM_VAR => r.natural().map(|_| ()),
        TERM_DELAY | TERM_LAMBDA | TERM_FORCE => skip_term(r, depth + 1),
        TERM_APPLY => {
            skip_term(r, depth + 1)?;
            skip_term(r, depth + 1)
        }
        TERM_CONSTANT => skip_constant(r),
        TERM_ERROR => Ok(()),
        TERM_BUILTIN => r.bits8(BUILTIN_TAG_BITS).map(|_| ()),
        TERM_CONSTR => {
            r.natural()?;
            skip_list(r, |r| skip_term(r, depth + 1))
        }
        TERM_CASE => {
            skip_term(r, depth + 1)?;
            skip_list(r, |r| skip_term(r, depth + 1))
        }
        t => Err(invalid(format!("unknown term tag {t}"))),
    }
}

/// Strip every CBOR byte-string envelope around a flat program.
pub fn unwrap_program(template: &[u8]) -> Vec<u8> {
    let mut program = template.to_vec();
    while let Some(inner) = cbor::unwrap_bytes(&program) {
        program = inner;
    }
    program
}

/// Apply `params` to the flat program `program`, returning the new flat
/// program. Parameters are applied left to right.
pub fn apply_params(program: &[u8], params: &[PlutusData]) -> Result<Vec<u8>> {
    let mut r = BitReader::new(program);
    for _ in 0..3 {
        r.natural()?;
    }
    let term_start = r.position();
    skip_term(&mut r, 0)?;
    let term_end = r.position();
    r.filler()?;
    if !r.is_empty() {
        return Err(invalid("trailing bytes after program"))
    }

    let mut w = BitWriter::new();
    w.copy_bits(program, 0, term_start);
    for _ in params {
        w.bits8(TERM_TAG_BITS, TERM_APPLY);
    }
    w.copy_bits(program, term_start, term_end);
    for param in params {
        w.data_constant(param);
    }
    w.filler();
    w.finish()
}
