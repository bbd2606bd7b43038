//! Tests for the theme engine

use super::*;
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use tera::Context as TeraContext;

fn base_context() -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("current_user", &Option::<String>::None);
    context.insert("messages", &Vec::<serde_json::Value>::new());
    context
}

#[test]
fn test_embedded_templates_are_loaded() {
    let engine = ThemeEngine::embedded().expect("Embedded templates should load");

    for name in [
        "base.html",
        "home.html",
        "item.html",
        "add_item.html",
        "posts.html",
        "post.html",
        "create_article.html",
        "update_article.html",
        "login.html",
        "register.html",
        "about.html",
        "error.html",
        "admin/dashboard.html",
        "admin/items.html",
        "admin/item_form.html",
        "admin/articles.html",
        "admin/article_form.html",
        "admin/users.html",
        "admin/user_form.html",
    ] {
        assert!(engine.has_template(name), "missing template {}", name);
    }
}

#[test]
fn test_render_home_lists_items() {
    let engine = ThemeEngine::embedded().unwrap();
    let mut context = base_context();
    context.insert(
        "items",
        &json!([
            {"id": 1, "title": "Stool", "price": 10, "is_active": true, "description": ""},
            {"id": 2, "title": "Chair", "price": 50, "is_active": true, "description": "Oak"}
        ]),
    );

    let html = engine.render("home.html", &context).expect("Render should succeed");

    assert!(html.contains("Stool"));
    assert!(html.contains("/buy/2"));
    assert!(html.find("Stool").unwrap() < html.find("Chair").unwrap());
}

#[test]
fn test_render_escapes_user_content() {
    let engine = ThemeEngine::embedded().unwrap();
    let mut context = base_context();
    context.insert(
        "item",
        &json!({"id": 1, "title": "<script>alert(1)</script>", "price": 5, "is_active": true, "description": ""}),
    );

    let html = engine.render("item.html", &context).unwrap();

    assert!(!html.contains("<script>alert(1)</script>"));
    assert!(html.contains("&lt;script&gt;"));
}

#[test]
fn test_render_flash_messages() {
    let engine = ThemeEngine::embedded().unwrap();
    let mut context = base_context();
    context.insert("messages", &json!([{"level": "error", "text": "Passwords do not match"}]));

    let html = engine.render("register.html", &context).unwrap();

    assert!(html.contains("flash-error"));
    assert!(html.contains("Passwords do not match"));
}

#[test]
fn test_render_missing_template_is_error() {
    let engine = ThemeEngine::embedded().unwrap();
    let result = engine.render("does-not-exist.html", &base_context());
    assert!(result.is_err());
}

#[test]
fn test_override_directory_replaces_template() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("about.html"),
        r#"{% extends "base.html" %}{% block content %}Custom about page{% endblock content %}"#,
    )
    .unwrap();

    let engine = ThemeEngine::new(Some(temp_dir.path())).expect("Overrides should load");
    let html = engine.render("about.html", &base_context()).unwrap();

    assert!(html.contains("Custom about page"));
    assert!(engine.has_template("home.html"));
}

#[test]
fn test_override_directory_adds_nested_templates() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("partials")).unwrap();
    fs::write(temp_dir.path().join("partials/banner.html"), "Sale!").unwrap();
    fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

    let engine = ThemeEngine::new(Some(temp_dir.path())).unwrap();

    assert!(engine.template_names().contains(&"partials/banner.html".to_string()));
    assert!(!engine.template_names().iter().any(|n| n.ends_with(".txt")));
}

#[test]
fn test_missing_override_directory_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope");

    let err = ThemeEngine::new(Some(&missing)).err().expect("Missing dir should fail");
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_broken_override_fails_to_load() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("home.html"), "{% if %}").unwrap();

    assert!(ThemeEngine::new(Some(temp_dir.path())).is_err());
}

#[test]
fn test_render_or_plain_falls_back() {
    let engine = ThemeEngine::embedded().unwrap();

    let html = engine.render_or_plain("missing.html", &base_context(), "Server <error>");

    assert!(html.contains("Server &lt;error&gt;"));
}
