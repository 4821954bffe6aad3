mod helpers;
mod ingredient;
mod pantry;
mod recipe;
mod shopping;
mod user;

pub(crate) use helpers::Output;
pub(crate) use ingredient::{cmd_ingredient_list, cmd_ingredient_show};
pub(crate) use pantry::{cmd_pantry_add, cmd_pantry_list, cmd_pantry_remove};
pub(crate) use recipe::{
    cmd_recipe_favorite, cmd_recipe_favorites, cmd_recipe_recommended, cmd_recipe_show,
    cmd_recipe_unfavorite,
};
pub(crate) use shopping::{cmd_shopping_check, cmd_shopping_list, cmd_shopping_set};
pub(crate) use user::{cmd_login, cmd_logout, cmd_register, cmd_whoami};
