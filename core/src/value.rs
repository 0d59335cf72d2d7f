//! Scalar kinds and the Rust types that can be bound to a field.
//!
//! Every bindable type maps onto one [`FieldKind`] and converts to and from
//! the uniform [`ScalarValue`] representation the coercion table works on.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Semantic kind of a bound scalar.
///
/// Closed set: the coercion table in [`crate::coerce`] holds one rule per
/// supported kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// Toggle, consumes no token.
    Bool,
    /// Any integer width or signedness.
    Int,
    /// Free text.
    Str,
    /// RFC 3339 timestamp.
    Time,
    /// IPv4 or IPv6 address.
    Ip,
    /// Network block in `addr/prefix` form.
    Cidr,
    /// Octal permission bits.
    Perm,
    /// Network interface name.
    Iface,
    /// File path. Reserved: no coercion rule yet.
    File,
}

/// A coerced value in kind-neutral form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarValue {
    Bool(bool),
    Int(i128),
    Str(String),
    Time(DateTime<FixedOffset>),
    Ip(IpAddr),
    Cidr(Cidr),
    Perm(Permission),
    Iface(Interface),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
            Self::Time(value) => f.write_str(&value.to_rfc3339()),
            Self::Ip(value) => write!(f, "{value}"),
            Self::Cidr(value) => write!(f, "{value}"),
            Self::Perm(value) => write!(f, "{value}"),
            Self::Iface(value) => write!(f, "{value}"),
        }
    }
}

/// A Rust type that can be bound to a field.
///
/// Implemented for the built-in kinds below. Custom implementations are
/// possible, but only kinds with a coercion rule can be built into a schema.
pub trait Scalar: Sized + 'static {
    /// Kind used to pick the coercion rule and type hint.
    const KIND: FieldKind;

    /// The zero value: what a freshly allocated slot holds, and the value
    /// that is never reported as a default.
    fn zero() -> Self;

    fn to_value(&self) -> ScalarValue;

    fn from_value(value: ScalarValue) -> Result<Self, String>;

    fn is_zero(&self) -> bool {
        self.to_value() == Self::zero().to_value()
    }
}

fn mismatch<T>(expected: FieldKind, got: &ScalarValue) -> Result<T, String> {
    Err(format!("expected {expected:?} value, got {got:?}"))
}

impl Scalar for bool {
    const KIND: FieldKind = FieldKind::Bool;

    fn zero() -> Self {
        false
    }

    fn to_value(&self) -> ScalarValue {
        ScalarValue::Bool(*self)
    }

    fn from_value(value: ScalarValue) -> Result<Self, String> {
        match value {
            ScalarValue::Bool(value) => Ok(value),
            other => mismatch(Self::KIND, &other),
        }
    }
}

macro_rules! int_scalar {
    ($($ty:ty),* $(,)?) => {$(
        impl Scalar for $ty {
            const KIND: FieldKind = FieldKind::Int;

            fn zero() -> Self {
                0
            }

            fn to_value(&self) -> ScalarValue {
                ScalarValue::Int(*self as i128)
            }

            fn from_value(value: ScalarValue) -> Result<Self, String> {
                match value {
                    ScalarValue::Int(value) => <$ty>::try_from(value)
                        .map_err(|_| format!("{value} out of range for {}", stringify!($ty))),
                    other => mismatch(Self::KIND, &other),
                }
            }
        }
    )*};
}

int_scalar!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Scalar for String {
    const KIND: FieldKind = FieldKind::Str;

    fn zero() -> Self {
        String::new()
    }

    fn to_value(&self) -> ScalarValue {
        ScalarValue::Str(self.clone())
    }

    fn from_value(value: ScalarValue) -> Result<Self, String> {
        match value {
            ScalarValue::Str(value) => Ok(value),
            other => mismatch(Self::KIND, &other),
        }
    }
}

impl Scalar for DateTime<FixedOffset> {
    const KIND: FieldKind = FieldKind::Time;

    fn zero() -> Self {
        DateTime::<FixedOffset>::default()
    }

    fn to_value(&self) -> ScalarValue {
        ScalarValue::Time(*self)
    }

    fn from_value(value: ScalarValue) -> Result<Self, String> {
        match value {
            ScalarValue::Time(value) => Ok(value),
            other => mismatch(Self::KIND, &other),
        }
    }
}

impl Scalar for IpAddr {
    const KIND: FieldKind = FieldKind::Ip;

    fn zero() -> Self {
        IpAddr::from([0, 0, 0, 0])
    }

    fn to_value(&self) -> ScalarValue {
        ScalarValue::Ip(*self)
    }

    fn from_value(value: ScalarValue) -> Result<Self, String> {
        match value {
            ScalarValue::Ip(value) => Ok(value),
            other => mismatch(Self::KIND, &other),
        }
    }
}

/// An IP network block, stored with host bits cleared.
///
/// # Examples
///
/// ```
/// use command_argparse_core::Cidr;
///
/// let net: Cidr = "192.168.1.77/24".parse().unwrap();
/// assert_eq!(net.to_string(), "192.168.1.0/24");
/// assert_eq!(net.prefix(), 24);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cidr {
    network: IpAddr,
    prefix: u8,
}

impl Cidr {
    pub fn network(&self) -> IpAddr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Whether `addr` falls inside this block.
    pub fn contains(&self, addr: IpAddr) -> bool {
        match (self.network, addr) {
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => {
                mask(addr, self.prefix) == self.network
            }
            _ => false,
        }
    }
}

fn mask(addr: IpAddr, prefix: u8) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => {
            let bits = u32::from(v4);
            let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
            IpAddr::from((bits & mask).to_be_bytes())
        }
        IpAddr::V6(v6) => {
            let bits = u128::from(v6);
            let mask = u128::MAX.checked_shl(128 - u32::from(prefix)).unwrap_or(0);
            IpAddr::from((bits & mask).to_be_bytes())
        }
    }
}

impl Default for Cidr {
    fn default() -> Self {
        Self {
            network: IpAddr::from([0, 0, 0, 0]),
            prefix: 0,
        }
    }
}

impl FromStr for Cidr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| format!("invalid CIDR: {s}"))?;
        let addr: IpAddr = addr.parse().map_err(|_| format!("invalid CIDR: {s}"))?;
        let prefix: u8 = prefix.parse().map_err(|_| format!("invalid CIDR: {s}"))?;
        let max = if addr.is_ipv4() { 32 } else { 128 };
        if prefix > max {
            return Err(format!("invalid CIDR: {s}"));
        }

        Ok(Self {
            network: mask(addr, prefix),
            prefix,
        })
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl Scalar for Cidr {
    const KIND: FieldKind = FieldKind::Cidr;

    fn zero() -> Self {
        Self::default()
    }

    fn to_value(&self) -> ScalarValue {
        ScalarValue::Cidr(*self)
    }

    fn from_value(value: ScalarValue) -> Result<Self, String> {
        match value {
            ScalarValue::Cidr(value) => Ok(value),
            other => mismatch(Self::KIND, &other),
        }
    }
}

/// File permission bits, written in octal.
///
/// # Examples
///
/// ```
/// use command_argparse_core::Permission;
///
/// let perm: Permission = "0644".parse().unwrap();
/// assert_eq!(perm.bits(), 0o644);
/// assert_eq!(perm.to_string(), "0644");
/// assert!("0o7777".parse::<Permission>().is_ok());
/// assert!("0888".parse::<Permission>().is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission(u32);

impl Permission {
    pub const MAX: u32 = 0o7777;

    pub fn new(bits: u32) -> Option<Self> {
        (bits <= Self::MAX).then_some(Self(bits))
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0o").unwrap_or(s);
        if digits.is_empty() || !digits.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
            return Err(format!("invalid PERM: {s}"));
        }

        u32::from_str_radix(digits, 8)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| format!("invalid PERM: {s}"))
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

impl Scalar for Permission {
    const KIND: FieldKind = FieldKind::Perm;

    fn zero() -> Self {
        Self::default()
    }

    fn to_value(&self) -> ScalarValue {
        ScalarValue::Perm(*self)
    }

    fn from_value(value: ScalarValue) -> Result<Self, String> {
        match value {
            ScalarValue::Perm(value) => Ok(value),
            other => mismatch(Self::KIND, &other),
        }
    }
}

static IFACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.:@-]{0,14}$").expect("static regex must compile")
});

/// A network interface name such as `eth0` or `lo0`.
///
/// Only the name syntax is checked; the interface does not have to exist on
/// the current host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interface(String);

impl Interface {
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl FromStr for Interface {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if IFACE_RE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(format!("invalid IFACE: {s:?}"))
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Scalar for Interface {
    const KIND: FieldKind = FieldKind::Iface;

    fn zero() -> Self {
        Self::default()
    }

    fn to_value(&self) -> ScalarValue {
        ScalarValue::Iface(self.clone())
    }

    fn from_value(value: ScalarValue) -> Result<Self, String> {
        match value {
            ScalarValue::Iface(value) => Ok(value),
            other => mismatch(Self::KIND, &other),
        }
    }
}
