//! Entity module - Contains all SeaORM entity definitions for the marketplace database.
//! Each entity has a Model struct for data and an Entity struct for operations.
//! Closed sets of values (roles, listing and order states) are string-backed active enums.

pub mod artisan;
pub mod cart_item;
pub mod category;
pub mod customer;
pub mod order;
pub mod order_detail;
pub mod product;
pub mod user;

// Re-export specific types to avoid conflicts
pub use artisan::{Column as ArtisanColumn, Entity as Artisan, Model as ArtisanModel};
pub use cart_item::{Column as CartItemColumn, Entity as CartItem, Model as CartItemModel};
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use customer::{Column as CustomerColumn, Entity as Customer, Model as CustomerModel};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel, OrderStatus};
pub use order_detail::{
    Column as OrderDetailColumn, Entity as OrderDetail, Model as OrderDetailModel,
};
pub use product::{Column as ProductColumn, Entity as Product, ListingStatus, Model as ProductModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, Role};
