use quickcheck::{Arbitrary, Gen};
use rand::Rng;
use std::net::Ipv4Addr;

use super::{ADDRESS_BITS, Address, AddressError, RangedAddress};

impl Arbitrary for Address {
	fn arbitrary<G: Gen>(g: &mut G) -> Self {
		if g.gen() {
			Address::from(Ipv4Addr::from(g.gen::<[u8; 4]>()))
		} else {
			Address(g.gen())
		}
	}
}

impl Arbitrary for RangedAddress {
	fn arbitrary<G: Gen>(g: &mut G) -> Self {
		let address: Address = Arbitrary::arbitrary(g);
		address.prefix(g.gen_range(0, ADDRESS_BITS + 1)).unwrap()
	}
}

fn address(text: &str) -> Address {
	Address::parse(text).unwrap()
}

#[test]
fn ipv4_is_mapped() {
	let mapped = Address::from(Ipv4Addr::new(1, 1, 1, 1));

	assert_eq!(mapped, Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff, 1, 1, 1, 1]));
	assert_eq!(mapped.to_ipv4(), Some(Ipv4Addr::new(1, 1, 1, 1)));
	assert_eq!(address("::ffff:1.1.1.1"), mapped);
}

#[test]
fn parse_good() {
	let good = Address([17, 17, 0, 0, 17, 17, 0, 0, 0, 0, 17, 17, 17, 17, 17, 17]);

	let cases = [
		("1.2.3.4", Address::from(Ipv4Addr::new(1, 2, 3, 4))),
		("::", Address([0; 16])),
		("::1", Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1])),
		("1111:0000:1111:0000:0000:1111:1111:1111", good),
		("1111:0:1111:0000:0000:1111:1111:1111", good),
		("1111:0000:1111::1111:1111:1111", good),
		("1111:0:1111::1111:1111:1111", good),
		("1111:0:1111::1111:17.17.17.17", good),
	];

	for (text, expected) in &cases {
		assert_eq!(Address::parse(text), Ok(*expected), "parsing {:?}", text);
	}
}

#[test]
fn parse_bad() {
	for text in &["", "1111::1111::", "0:0", "g:g:g:g:g:g:g:g", "a.b.c.d", "1.2.3.256", "1.2.3", "1:2:3:4:5:6:7:8:9", "10000::"] {
		assert_eq!(Address::parse(text), Err(AddressError::BadAddress), "parsing {:?}", text);
	}
}

#[test]
fn families_never_collide() {
	assert_ne!(address("0.0.0.0"), address("::"));
	assert_ne!(address("255.255.255.255"), address("ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff"));
	assert_ne!(address("0.0.0.1"), address("::1"));
}

#[test]
fn display() {
	let cases = [
		(Address([0; 16]), "::"),
		(Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]), "::1"),
		(Address([1, 1, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0]), "101::101:101:101:0:0"),
		(Address::from(Ipv4Addr::new(0, 0, 0, 0)), "0.0.0.0"),
		(Address::from(Ipv4Addr::new(1, 2, 3, 4)), "1.2.3.4"),
	];

	for (address, expected) in &cases {
		assert_eq!(address.to_string(), *expected);
	}
}

#[test]
fn bits_are_msb_first() {
	let address = Address([0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01]);

	assert!(address.bit(0));
	assert!(!address.bit(1));
	assert!(!address.bit(126));
	assert!(address.bit(127));
}

#[test]
fn every_prefix_length() {
	let address = Address([0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);

	for bits in 0..=ADDRESS_BITS {
		let range = RangedAddress::new(address, bits).unwrap();
		assert_eq!(range.prefix_length(), bits);

		for index in 0..ADDRESS_BITS {
			let expected = index < bits && address.bit(index);
			assert_eq!(range.address().bit(index), expected, "bit {} of /{}", index, bits);
		}
	}

	for bits in (ADDRESS_BITS + 1)..=u8::MAX {
		assert_eq!(RangedAddress::new(address, bits), Err(AddressError::BadPrefixLength));
	}
}

#[quickcheck]
fn prefix_masks_trailing_bits(address: Address, bits: u8) -> bool {
	match address.prefix(bits) {
		Ok(range) => {
			bits <= ADDRESS_BITS
				&& (0..ADDRESS_BITS).all(|index| {
					range.address().bit(index) == (index < bits && address.bit(index))
				})
		},
		Err(err) => bits > ADDRESS_BITS && err == AddressError::BadPrefixLength,
	}
}

#[quickcheck]
fn range_contains_its_addresses(range: RangedAddress, other: Address) -> bool {
	let agrees = (0..range.prefix_length()).all(|index| range.address().bit(index) == other.bit(index));

	range.contains(range.address()) && range.contains(&other) == agrees
}

#[quickcheck]
fn covers_matches_contains(a: RangedAddress, b: RangedAddress) -> bool {
	a.covers(&b) == (a.prefix_length() <= b.prefix_length() && a.contains(b.address()))
		&& a.covers(&a)
}

#[quickcheck]
fn ranged_round_trip(range: RangedAddress) -> bool {
	RangedAddress::parse(&range.to_string()) == Ok(range)
}

#[test]
fn parse_ranged_good() {
	let v6_one = Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
	let v4 = Address::from(Ipv4Addr::new(1, 2, 3, 4));

	let cases = [
		("::/0", Address([0; 16]), 0),
		("::1/128", v6_one, 128),
		("::1/127", v6_one, 127),
		("1.2.3.4/32", v4, 128),
		("1.2.3.4/24", v4, 120),
		("1.2.3.4/0", v4, 96),
		("::ffff:1.2.3.4/120", v4, 120),
	];

	for &(text, address, prefix_length) in &cases {
		assert_eq!(
			RangedAddress::parse(text),
			RangedAddress::new(address, prefix_length),
			"parsing {:?}",
			text
		);
	}
}

#[test]
fn parse_ranged_bad() {
	let cases = [
		("1.2.3.4", AddressError::BadRangedAddress),
		("1.2.3.4/0/0", AddressError::BadRangedAddress),
		("1.2.3.4/a", AddressError::BadPrefixLength),
		("1.2.3.4/-256", AddressError::BadPrefixLength),
		("1.2.3.4/", AddressError::BadPrefixLength),
		("1.2.3.4/+24", AddressError::BadPrefixLength),
		("::/+0", AddressError::BadPrefixLength),
		("1.2.3.4/ 24", AddressError::BadPrefixLength),
		("1.2.3.4/33", AddressError::BadPrefixLength),
		// IPv4 prefix lengths count IPv4 bits, so the 128-bit form of a single address is out of range.
		("1.2.3.4/128", AddressError::BadPrefixLength),
		("1.2.3.4/129", AddressError::BadPrefixLength),
		("::/129", AddressError::BadPrefixLength),
		("::/256", AddressError::BadPrefixLength),
		("1.2.3.a/32", AddressError::BadAddress),
		("1111::1111::/128", AddressError::BadAddress),
		("/24", AddressError::BadAddress),
	];

	for &(text, expected) in &cases {
		assert_eq!(RangedAddress::parse(text), Err(expected), "parsing {:?}", text);
	}
}

#[test]
fn ranged_display() {
	let cases = [
		(Address([0; 16]), 128, "::/128"),
		(Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]), 127, "::/127"),
		(Address([1, 1, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0]), 120, "101::101:101:101:0:0/120"),
		(Address::from(Ipv4Addr::new(0, 0, 0, 0)), 96, "0.0.0.0/0"),
		(Address::from(Ipv4Addr::new(1, 2, 3, 4)), 128, "1.2.3.4/32"),
		(Address::from(Ipv4Addr::new(203, 0, 113, 200)), 120, "203.0.113.0/24"),
		(Address::from(Ipv4Addr::new(1, 2, 3, 4)), 80, "::/80"),
	];

	for &(address, prefix_length, expected) in &cases {
		assert_eq!(RangedAddress::new(address, prefix_length).unwrap().to_string(), expected);
	}
}
