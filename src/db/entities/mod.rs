//! Sea-ORM entity definitions
//!
//! These map the conversion data model to database tables.

pub mod issue;
pub mod item;
pub mod item_author;
pub mod section;
pub mod unit;
pub mod unit_hier;
pub mod unit_item;

// Re-export all entities
pub use issue::Entity as Issue;
pub use item::Entity as Item;
pub use item_author::Entity as ItemAuthor;
pub use section::Entity as Section;
pub use unit::Entity as Unit;
pub use unit_hier::Entity as UnitHier;
pub use unit_item::Entity as UnitItem;

// Re-export active models for easy access
pub use issue::ActiveModel as IssueActive;
pub use item::ActiveModel as ItemActive;
pub use item_author::ActiveModel as ItemAuthorActive;
pub use section::ActiveModel as SectionActive;
pub use unit::ActiveModel as UnitActive;
pub use unit_hier::ActiveModel as UnitHierActive;
pub use unit_item::ActiveModel as UnitItemActive;
