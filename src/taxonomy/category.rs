use std::collections::BTreeSet;
use std::fmt;
use serde::{Serialize, Deserialize};
use crate::core::error::{Error, ErrorKind, Result};

pub const MIN_GROUP: u8 = 1;
pub const MAX_GROUP: u8 = 6;

pub fn validate_group(group: u8) -> Result<()> {
    if (MIN_GROUP..=MAX_GROUP).contains(&group) {
        Ok(())
    } else {
        Err(Error::new(
            ErrorKind::InvalidGroup,
            format!("Invalid group: {}", group),
        ))
    }
}

/// Subject taxonomy entry. Aliases are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Category {
    group: u8,
    display_name: String,
    aliases: BTreeSet<String>,
    active: bool,
}

impl Category {
    pub fn new<I, S>(group: u8, display_name: &str, active: bool, aliases: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        validate_group(group)?;
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "Category display name is empty",
            ));
        }
        Ok(Self::unchecked(group, display_name, active, aliases))
    }

    /// Built-in taxonomy entries whose group is known to be valid
    pub(crate) fn unchecked<I, S>(group: u8, display_name: &str, active: bool, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Category {
            group,
            display_name: display_name.to_string(),
            aliases: aliases
                .into_iter()
                .map(|alias| alias.as_ref().trim().to_lowercase())
                .filter(|alias| !alias.is_empty())
                .collect(),
            active,
        }
    }

    pub fn group(&self) -> u8 {
        self.group
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn aliases(&self) -> &BTreeSet<String> {
        &self.aliases
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Case-insensitive match against the display name or any alias
    pub fn is_named(&self, name: &str) -> bool {
        let lowered = name.trim().to_lowercase();
        self.display_name.to_lowercase() == lowered || self.aliases.contains(&lowered)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}
