#[cfg(test)]
mod tests;

use std::error::Error;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

pub const ADDRESS_BYTES: usize = 16;
pub const ADDRESS_BITS: u8 = 8 * (ADDRESS_BYTES as u8);
pub const IPV4_BITS: u8 = 32;

/// Prefix lengths written after a dotted-quad address count from this bit.
const IPV4_OFFSET: u8 = ADDRESS_BITS - IPV4_BITS;

/// The first 12 bytes of every IPv4 address embedded in the 16-byte space.
const IPV4_PREFIX: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff];

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AddressError {
	/// The text isn’t an IPv4 or IPv6 address.
	BadAddress,
	/// The text isn’t exactly one address and one prefix length separated by `/`.
	BadRangedAddress,
	/// The prefix length is missing, isn’t a number, or is longer than the address.
	BadPrefixLength,
}

impl Error for AddressError {}

impl fmt::Display for AddressError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(
			match self {
				Self::BadAddress => "bad address",
				Self::BadRangedAddress => "bad ranged address",
				Self::BadPrefixLength => "bad prefix length",
			}
		)
	}
}

/// An IPv4 or IPv6 address. IPv4 addresses are stored IPv4-mapped (`::ffff:a.b.c.d`), so they never equal an IPv6 address with the same trailing bytes.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Address([u8; ADDRESS_BYTES]);

impl Address {
	pub const fn new(octets: [u8; ADDRESS_BYTES]) -> Self {
		Self(octets)
	}

	/// Parses dotted-quad or colon-hex notation.
	pub fn parse(text: &str) -> Result<Self, AddressError> {
		text.parse::<IpAddr>()
			.map(Self::from)
			.map_err(|_| AddressError::BadAddress)
	}

	pub fn octets(&self) -> &[u8; ADDRESS_BYTES] {
		&self.0
	}

	/// Whether bit `index` (counted from the most significant bit of the first byte) is set.
	pub fn bit(&self, index: u8) -> bool {
		debug_assert!(index < ADDRESS_BITS);
		self.0[usize::from(index / 8)] & (0x80 >> (index % 8)) != 0
	}

	pub(crate) fn set_bit(&mut self, index: u8) {
		self.0[usize::from(index / 8)] |= 0x80 >> (index % 8);
	}

	pub fn to_ipv4(&self) -> Option<Ipv4Addr> {
		if self.0[..IPV4_PREFIX.len()] == IPV4_PREFIX {
			Some(Ipv4Addr::new(self.0[12], self.0[13], self.0[14], self.0[15]))
		} else {
			None
		}
	}

	/// The range of addresses sharing the first `bits` bits with this one.
	pub fn prefix(&self, bits: u8) -> Result<RangedAddress, AddressError> {
		if bits > ADDRESS_BITS {
			return Err(AddressError::BadPrefixLength);
		}

		let mut result = [0; ADDRESS_BYTES];
		let wholes = usize::from(bits / 8);
		let remainder = bits % 8;
		result[..wholes].copy_from_slice(&self.0[..wholes]);

		if remainder != 0 {
			result[wholes] = self.0[wholes] & mask(remainder);
		}

		Ok(RangedAddress {
			address: Address(result),
			prefix_length: bits,
		})
	}
}

impl From<[u8; ADDRESS_BYTES]> for Address {
	fn from(octets: [u8; ADDRESS_BYTES]) -> Self {
		Self(octets)
	}
}

impl From<Ipv4Addr> for Address {
	fn from(address: Ipv4Addr) -> Self {
		let mut result = [0; ADDRESS_BYTES];
		result[..IPV4_PREFIX.len()].copy_from_slice(&IPV4_PREFIX);
		result[IPV4_PREFIX.len()..].copy_from_slice(&address.octets());
		Self(result)
	}
}

impl From<Ipv6Addr> for Address {
	fn from(address: Ipv6Addr) -> Self {
		Self(address.octets())
	}
}

impl From<IpAddr> for Address {
	fn from(address: IpAddr) -> Self {
		match address {
			IpAddr::V4(v4) => v4.into(),
			IpAddr::V6(v6) => v6.into(),
		}
	}
}

impl From<Address> for IpAddr {
	fn from(address: Address) -> Self {
		match address.to_ipv4() {
			Some(v4) => IpAddr::V4(v4),
			None => IpAddr::V6(Ipv6Addr::from(address.0)),
		}
	}
}

impl FromStr for Address {
	type Err = AddressError;

	fn from_str(text: &str) -> Result<Self, Self::Err> {
		Self::parse(text)
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		fmt::Display::fmt(&IpAddr::from(*self), f)
	}
}

/// An address with every bit after the prefix cleared, together with the prefix length.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RangedAddress {
	/// The first address in the range, i.e. the one ending with `ADDRESS_BITS - prefix_length` zero bits.
	address: Address,

	/// The number of significant bits.
	prefix_length: u8,
}

impl RangedAddress {
	pub fn new(address: Address, prefix_length: u8) -> Result<Self, AddressError> {
		address.prefix(prefix_length)
	}

	/// Parses `<address>/<prefix-length>`. After a dotted-quad address the prefix length counts IPv4 bits, so `192.0.2.0/24` is the same range as `::ffff:192.0.2.0/120`.
	pub fn parse(text: &str) -> Result<Self, AddressError> {
		let mut parts = text.split('/');

		let (address, prefix_length) =
			match (parts.next(), parts.next(), parts.next()) {
				(Some(address), Some(prefix_length), None) => (address, prefix_length),
				_ => return Err(AddressError::BadRangedAddress),
			};

		let is_ipv6 = address.contains(':');
		let address = Address::parse(address)?;

		// Digits only: `u8::from_str` would also take a leading `+`.
		if !prefix_length.bytes().all(|byte| byte.is_ascii_digit()) {
			return Err(AddressError::BadPrefixLength);
		}

		let prefix_length = prefix_length.parse::<u8>()
			.map_err(|_| AddressError::BadPrefixLength)?;

		let prefix_length =
			if is_ipv6 {
				prefix_length
			} else if prefix_length <= IPV4_BITS {
				IPV4_OFFSET + prefix_length
			} else {
				return Err(AddressError::BadPrefixLength);
			};

		Self::new(address, prefix_length)
	}

	pub fn address(&self) -> &Address {
		&self.address
	}

	pub fn prefix_length(&self) -> u8 {
		self.prefix_length
	}

	/// Whether `address` agrees with this range on every significant bit.
	pub fn contains(&self, address: &Address) -> bool {
		let Self { address: first, prefix_length } = self;
		let wholes = usize::from(prefix_length / 8);
		let remainder = prefix_length % 8;

		first.0[..wholes] == address.0[..wholes]
			&& (remainder == 0 || (first.0[wholes] ^ address.0[wholes]) & mask(remainder) == 0)
	}

	/// Whether every address in `other` is also in this range.
	pub fn covers(&self, other: &RangedAddress) -> bool {
		self.prefix_length <= other.prefix_length && self.contains(&other.address)
	}
}

impl FromStr for RangedAddress {
	type Err = AddressError;

	fn from_str(text: &str) -> Result<Self, Self::Err> {
		Self::parse(text)
	}
}

impl fmt::Display for RangedAddress {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self.address.to_ipv4() {
			Some(v4) if self.prefix_length >= IPV4_OFFSET => write!(f, "{}/{}", v4, self.prefix_length - IPV4_OFFSET),
			_ => write!(f, "{}/{}", self.address, self.prefix_length),
		}
	}
}

/// A byte with the first n bits set.
const fn mask(n: u8) -> u8 {
	!(0xff_u8 >> n)
}
