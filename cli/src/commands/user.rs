use anyhow::{Context, Result};
use futures::StreamExt;

use easymeal_core::models::User;
use easymeal_core::repository::Repositories;

use super::helpers::{Output, finish, first, print_json, prompt_line};

pub(crate) async fn cmd_register(
    repos: &Repositories,
    name: &str,
    email: &str,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => prompt_line("Password")?,
    };
    let response = finish(repos.users.register(name, email, &password)).await?;
    if json {
        print_json(&response)?;
    } else {
        println!("{}", response.message);
        println!("Log in with: easymeal login {email}");
    }
    Ok(())
}

pub(crate) async fn cmd_login(
    repos: &Repositories,
    email: &str,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => prompt_line("Password")?,
    };
    let response = finish(repos.users.login(email, &password)).await?;
    let result = response
        .login_result
        .context("Login response did not include a user")?;

    let user = User {
        id: result.user_id,
        name: result.name,
        email: result.email,
        token: result.token,
        is_logged_in: true,
    };
    repos.users.save_user(&user)?;

    if json {
        print_json(&user)?;
    } else {
        println!("Logged in as {} <{}>", user.name, user.email);
    }
    Ok(())
}

pub(crate) fn cmd_logout(repos: &Repositories, json: bool) -> Result<()> {
    let was = repos.users.current_user();
    repos.users.logout()?;
    repos.recipes.clear_favorite()?;
    if json {
        println!("{}", serde_json::json!({ "logged_out": was.is_logged_in }));
    } else if was.is_logged_in {
        println!("Logged out {}", was.email);
    } else {
        println!("Nobody was logged in");
    }
    Ok(())
}

pub(crate) async fn cmd_whoami(repos: &Repositories, out: Output) -> Result<()> {
    let mut users = repos.users.get_user();
    while let Some(user) = users.next().await {
        let has_pantry = first(repos.ingredients.is_pantry_not_empty()).await?;
        if out.json {
            println!(
                "{}",
                serde_json::json!({
                    "id": user.id,
                    "name": user.name,
                    "email": user.email,
                    "is_logged_in": user.is_logged_in,
                    "has_pantry": has_pantry,
                })
            );
        } else if user.is_logged_in {
            let pantry = if has_pantry { "stocked" } else { "empty" };
            println!("{} <{}> (id {}), pantry {pantry}", user.name, user.email, user.id);
        } else {
            println!("Not logged in");
        }
        if !out.watch {
            break;
        }
    }
    Ok(())
}
