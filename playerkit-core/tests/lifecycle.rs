//! Registration, creation policies, resolution and teardown

mod common;

use std::sync::Arc;

use common::*;
use playerkit_core::{
    CapabilityKey, ContextError, ContextExt, CreateOptions, CreatePolicy, EventOptions, Observer,
    PluginInstance, ProviderClass, Scope, capability_loaded_event, handler, payload,
};

fn speed_key() -> CapabilityKey {
    CapabilityKey::of::<dyn SpeedService>()
}

// ==================== Creation Policy Tests ====================

#[test]
fn empty_policy_creates_at_registration() {
    let log = new_log();
    let player = Scope::named("player");

    player
        .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();

    assert_eq!(
        take(&log),
        vec!["speed:new", "speed:bind", "speed:load@player"]
    );
    assert_eq!(player.instances().len(), 1);
}

#[test]
fn first_resolve_policy_waits_for_resolution() {
    let log = new_log();
    let player = Scope::named("player");

    player
        .register(
            speed_provider(&log),
            CreatePolicy::ON_FIRST_RESOLVE,
            CreateOptions::NONE,
        )
        .unwrap();
    assert!(take(&log).is_empty());
    assert!(player.is_registered::<dyn SpeedService>());

    let speed = player.resolve::<dyn SpeedService>().unwrap();
    assert_eq!(speed.rate(), 1.0);
    assert_eq!(
        take(&log),
        vec!["speed:new", "speed:bind", "speed:load@player"]
    );

    // Second resolution reuses the instance
    player.resolve::<dyn SpeedService>().unwrap();
    assert!(take(&log).is_empty());
}

#[test]
fn first_configure_policy_creates_with_payload() {
    let log = new_log();
    let player = Scope::named("player");

    player
        .register(
            speed_provider(&log),
            CreatePolicy::ON_FIRST_CONFIGURE,
            CreateOptions::NONE,
        )
        .unwrap();
    assert!(player.try_resolve::<dyn SpeedService>().is_none());

    player
        .configure::<dyn SpeedService>(payload(2.0_f64))
        .unwrap();

    assert_eq!(
        take(&log),
        vec![
            "speed:new",
            "speed:bind",
            "speed:configure",
            "speed:load@player"
        ]
    );
    assert_eq!(player.resolve::<dyn SpeedService>().unwrap().rate(), 2.0);
}

#[test]
fn eager_option_overrides_lazy_batch() {
    let log = new_log();
    let player = Scope::named("player");

    player.batch_register(CreatePolicy::ON_FIRST_RESOLVE, &[], |scope| {
        scope
            .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::EAGER)
            .unwrap();
        scope
            .register(volume_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
            .unwrap();
    });

    let events = take(&log);
    assert!(events.contains(&"speed:load@player".to_string()));
    assert!(!events.iter().any(|e| e.starts_with("volume")));
}

#[test]
fn event_policy_creates_on_trigger() {
    let log = new_log();
    let player = Scope::named("player");

    player.batch_register(CreatePolicy::ON_EVENT, &["player.prepared"], |scope| {
        scope
            .register(danmaku_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
            .unwrap();
    });
    assert!(take(&log).is_empty());

    player.publish("player.play", None);
    assert!(take(&log).is_empty());

    player.publish("player.prepared", None);
    assert_eq!(
        take(&log),
        vec!["danmaku:new", "danmaku:bind", "danmaku:load@player"]
    );

    player.publish("player.prepared", None);
    assert!(take(&log).is_empty());
}

#[test]
fn event_policy_fires_on_child_publish() {
    let log = new_log();
    let player = Scope::named("player");
    let controls = Scope::named("controls");
    player.attach_child(&controls).unwrap();

    player.batch_register(CreatePolicy::ON_EVENT, &["player.prepared"], |scope| {
        scope
            .register(danmaku_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
            .unwrap();
    });

    controls.publish("player.prepared", None);
    assert!(player.try_resolve::<dyn DanmakuService>().is_some());
}

#[test]
fn event_policy_uses_sticky_trigger() {
    let log = new_log();
    let player = Scope::named("player");
    player.bind_sticky("player.prepared", payload(1_u32));

    player.batch_register(CreatePolicy::ON_EVENT, &["player.prepared"], |scope| {
        scope
            .register(danmaku_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
            .unwrap();
    });

    assert!(snapshot(&log).contains(&"danmaku:load@player".to_string()));
}

#[test]
fn nested_batches_restore_outer_policy() {
    let log = new_log();
    let player = Scope::named("player");

    player.batch_register(CreatePolicy::ON_FIRST_RESOLVE, &[], |scope| {
        scope.batch_register(CreatePolicy::ON_EVENT, &["player.prepared"], |inner| {
            inner
                .register(danmaku_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
                .unwrap();
        });
        scope
            .register(volume_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
            .unwrap();
    });
    player
        .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();

    // Only the registration outside every batch is eager
    let events = take(&log);
    assert_eq!(events, vec!["speed:new", "speed:bind", "speed:load@player"]);

    let snapshot = player.snapshot();
    let volume = snapshot
        .registrations
        .iter()
        .find(|r| r.key == CapabilityKey::of::<dyn VolumeService>())
        .unwrap();
    assert_eq!(volume.policy, vec!["ON_FIRST_RESOLVE"]);
}

// ==================== Relationship Notification Tests ====================

#[test]
fn created_instance_sees_existing_relationships() {
    let log = new_log();
    let player = Scope::named("player");
    let controls = Scope::named("controls");
    let overlay = Scope::named("overlay");
    player.attach_child(&controls).unwrap();
    controls.attach_child(&overlay).unwrap();

    controls
        .register(
            speed_provider(&log),
            CreatePolicy::ON_FIRST_RESOLVE,
            CreateOptions::NONE,
        )
        .unwrap();
    controls.resolve::<dyn SpeedService>().unwrap();

    assert_eq!(
        take(&log),
        vec![
            "speed:new",
            "speed:bind",
            "speed:load@controls",
            "speed:attached->player",
            "speed:child+overlay"
        ]
    );
}

#[test]
fn created_instance_sees_base() {
    let log = new_log();
    let player = Scope::named("player");
    let ad = Scope::named("ad");
    player.attach_extension(&ad).unwrap();

    ad.register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();

    assert_eq!(
        take(&log),
        vec![
            "speed:new",
            "speed:bind",
            "speed:load@ad",
            "speed:extends->player"
        ]
    );
}

// ==================== Resolution Tests ====================

#[test]
fn resolution_prefers_local_registration() {
    let log = new_log();
    let player = Scope::named("player");
    let controls = Scope::named("controls");
    player.attach_child(&controls).unwrap();

    controls
        .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();
    player
        .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();

    let speed = player.resolve::<dyn SpeedService>().unwrap();
    assert_eq!(speed.scope_name().as_deref(), Some("player"));
}

#[test]
fn resolution_searches_children_depth_first() {
    let log = new_log();
    let player = Scope::named("player");
    let controls = Scope::named("controls");
    let overlay = Scope::named("overlay");
    let panel = Scope::named("panel");
    player.attach_child(&controls).unwrap();
    controls.attach_child(&overlay).unwrap();
    player.attach_child(&panel).unwrap();

    overlay
        .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();
    panel
        .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();

    let speed = player.resolve::<dyn SpeedService>().unwrap();
    assert_eq!(speed.scope_name().as_deref(), Some("overlay"));
}

#[test]
fn resolution_never_consults_parent() {
    let log = new_log();
    let player = Scope::named("player");
    let controls = Scope::named("controls");
    player.attach_child(&controls).unwrap();

    player
        .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();

    assert!(controls.try_resolve::<dyn SpeedService>().is_none());
    assert_eq!(
        controls.require::<dyn SpeedService>().err(),
        Some(ContextError::NotFound(speed_key().to_string()))
    );
}

#[test]
fn extension_resolves_through_base() {
    let log = new_log();
    let player = Scope::named("player");
    let ad = Scope::named("ad");
    player.attach_extension(&ad).unwrap();

    player
        .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();

    let speed = ad.resolve::<dyn SpeedService>().unwrap();
    assert_eq!(speed.scope_name().as_deref(), Some("player"));
    // The base does not see into its extensions
    ad.register(volume_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();
    assert!(player.try_resolve::<dyn VolumeService>().is_none());
}

#[test]
fn child_search_does_not_follow_child_base() {
    let log = new_log();
    let player = Scope::named("player");
    let controls = Scope::named("controls");
    let skin = Scope::named("skin");
    player.attach_child(&controls).unwrap();
    skin.attach_extension(&controls).unwrap();

    skin.register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();

    assert!(controls.try_resolve::<dyn SpeedService>().is_some());
    assert!(player.try_resolve::<dyn SpeedService>().is_none());
}

#[test]
fn local_entry_that_cannot_resolve_shadows_others() {
    let log = new_log();
    let player = Scope::named("player");
    let controls = Scope::named("controls");
    player.attach_child(&controls).unwrap();

    controls
        .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();
    player
        .register(
            speed_provider(&log),
            CreatePolicy::ON_FIRST_CONFIGURE,
            CreateOptions::NONE,
        )
        .unwrap();

    assert!(player.try_resolve::<dyn SpeedService>().is_none());
}

#[test]
fn resolve_wrong_capability_type_is_none() {
    let log = new_log();
    let player = Scope::named("player");
    player
        .register(
            speed_provider(&log).with_key(CapabilityKey::of::<dyn VolumeService>()),
            CreatePolicy::NONE,
            CreateOptions::NONE,
        )
        .unwrap();

    assert!(player.resolve::<dyn VolumeService>().is_none());
    assert!(matches!(
        player.require::<dyn VolumeService>(),
        Err(ContextError::TypeMismatch { .. })
    ));
}

// ==================== Configuration Tests ====================

#[test]
fn configure_unregistered_is_error() {
    let player = Scope::named("player");
    let err = player
        .configure::<dyn SpeedService>(payload(2.0_f64))
        .unwrap_err();
    assert_eq!(err, ContextError::NotRegistered(speed_key().to_string()));
}

#[test]
fn configure_only_targets_local_registration() {
    let log = new_log();
    let player = Scope::named("player");
    let controls = Scope::named("controls");
    player.attach_child(&controls).unwrap();
    controls
        .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();

    assert!(player.configure::<dyn SpeedService>(payload(2.0_f64)).is_err());
}

#[test]
fn configure_live_instance_delivers_immediately() {
    let log = new_log();
    let player = Scope::named("player");
    player
        .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();
    take(&log);

    player
        .configure::<dyn SpeedService>(payload(1.5_f64))
        .unwrap();
    assert_eq!(take(&log), vec!["speed:configure"]);
    assert_eq!(player.resolve::<dyn SpeedService>().unwrap().rate(), 1.5);
}

#[test]
fn stored_configuration_applies_on_later_creation() {
    let log = new_log();
    let player = Scope::named("player");
    player
        .register(
            speed_provider(&log),
            CreatePolicy::ON_FIRST_RESOLVE,
            CreateOptions::NONE,
        )
        .unwrap();

    player
        .configure::<dyn SpeedService>(payload(3.0_f64))
        .unwrap();
    assert!(take(&log).is_empty());

    assert_eq!(player.resolve::<dyn SpeedService>().unwrap().rate(), 3.0);
    assert_eq!(
        take(&log),
        vec![
            "speed:new",
            "speed:bind",
            "speed:configure",
            "speed:load@player"
        ]
    );
}

// ==================== Replacement and Removal Tests ====================

#[test]
fn duplicate_registration_replaces_instance() {
    let log = new_log();
    let player = Scope::named("player");
    player
        .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();
    let first = player.resolve_key(&speed_key()).unwrap();
    take(&log);

    player
        .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();

    assert_eq!(
        take(&log),
        vec![
            "speed:unload@player",
            "speed:new",
            "speed:bind",
            "speed:load@player"
        ]
    );
    let second = player.resolve_key(&speed_key()).unwrap();
    assert!(!first.ptr_eq(&second));
    assert_eq!(player.instances().len(), 1);
}

#[test]
fn unregister_recurses_into_children() {
    let log = new_log();
    let player = Scope::named("player");
    let controls = Scope::named("controls");
    player.attach_child(&controls).unwrap();
    controls
        .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();
    take(&log);

    assert!(player.unregister(&speed_key()));
    assert_eq!(take(&log), vec!["speed:unload@controls"]);
    assert!(!controls.is_registered::<dyn SpeedService>());
    assert!(!player.unregister(&speed_key()));
}

#[test]
fn unregister_clears_every_child_and_base() {
    let log = new_log();
    let player = Scope::named("player");
    let controls = Scope::named("controls");
    let panel = Scope::named("panel");
    let ad = Scope::named("ad");
    player.attach_child(&controls).unwrap();
    player.attach_child(&panel).unwrap();
    player.attach_extension(&ad).unwrap();
    for scope in [&controls, &panel, &player] {
        scope
            .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
            .unwrap();
    }
    take(&log);

    assert!(ad.unregister(&speed_key()));
    assert_eq!(take(&log), vec!["speed:unload@player"]);
    assert!(controls.is_registered::<dyn SpeedService>());

    assert!(player.unregister(&speed_key()));
    assert_eq!(
        take(&log),
        vec!["speed:unload@controls", "speed:unload@panel"]
    );
    assert!(!panel.is_registered::<dyn SpeedService>());
}

#[test]
fn unregister_reaches_base() {
    let log = new_log();
    let player = Scope::named("player");
    let ad = Scope::named("ad");
    player.attach_extension(&ad).unwrap();
    player
        .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();

    assert!(ad.unregister(&speed_key()));
    assert!(!player.is_registered::<dyn SpeedService>());
}

#[test]
fn unregister_class_removes_all_keys_of_class() {
    let log = new_log();
    let player = Scope::named("player");
    player
        .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();
    player
        .register(
            speed_provider(&log).with_key("SpeedAlias"),
            CreatePolicy::NONE,
            CreateOptions::NONE,
        )
        .unwrap();
    player
        .register(volume_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();

    assert_eq!(player.unregister_class(&ProviderClass::of::<SpeedPlugin>()), 2);
    assert_eq!(player.registered_keys().len(), 1);
}

#[test]
fn register_instance_and_detach() {
    let log = new_log();
    let player = Scope::named("player");
    let plugin = Arc::new(SpeedPlugin::new(&log));
    let instance =
        PluginInstance::new(plugin, |p: Arc<SpeedPlugin>| p as Arc<dyn SpeedService>);

    player.register_instance(instance.clone(), speed_key());
    assert_eq!(
        take(&log),
        vec!["speed:new", "speed:bind", "speed:load@player"]
    );
    assert!(player.resolve_key(&speed_key()).unwrap().ptr_eq(&instance));

    let detached = player.detach_instance(&speed_key()).unwrap();
    assert!(detached.ptr_eq(&instance));
    assert_eq!(take(&log), vec!["speed:unbind"]);
    assert!(!player.is_registered::<dyn SpeedService>());
    assert!(player.detach_instance(&speed_key()).is_none());

    // A detached instance can be handed to another scope
    let other = Scope::named("other");
    other.register_instance(detached, speed_key());
    assert_eq!(
        other.resolve::<dyn SpeedService>().unwrap().scope_name().as_deref(),
        Some("other")
    );
}

// ==================== Teardown Tests ====================

#[test]
fn dropping_scope_unloads_in_reverse_creation_order() {
    let log = new_log();
    let player = Scope::named("player");
    player
        .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();
    player
        .register(volume_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();
    player
        .register(
            danmaku_provider(&log),
            CreatePolicy::ON_FIRST_RESOLVE,
            CreateOptions::NONE,
        )
        .unwrap();
    take(&log);

    drop(player);
    assert_eq!(
        take(&log),
        vec!["volume:unload@player", "speed:unload@player"]
    );
}

// ==================== Loaded Event Tests ====================

#[test]
fn loaded_event_delivers_instance() {
    let log = new_log();
    let player = Scope::named("player");
    let observer = Observer::new();
    let seen = new_log();
    let sink = Arc::clone(&seen);
    player.subscribe(
        &observer,
        &capability_loaded_event(&speed_key()),
        EventOptions::NONE,
        handler(move |payload, _| {
            let instance = payload.and_then(|p| p.downcast_ref::<PluginInstance>());
            let rate = instance
                .and_then(|i| i.service::<dyn SpeedService>())
                .map(|s| s.rate());
            sink.lock().unwrap().push(format!("{rate:?}"));
        }),
    );

    player
        .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();
    assert_eq!(take(&seen), vec!["Some(1.0)"]);
}

#[test]
fn late_loaded_subscriber_gets_sticky_instance() {
    let log = new_log();
    let player = Scope::named("player");
    let controls = Scope::named("controls");
    player.attach_child(&controls).unwrap();
    controls
        .register(speed_provider(&log), CreatePolicy::NONE, CreateOptions::NONE)
        .unwrap();

    let observer = Observer::new();
    let seen = new_log();
    player.subscribe(
        &observer,
        &capability_loaded_event(&speed_key()),
        EventOptions::NONE,
        tagged(&seen, "loaded"),
    );
    assert_eq!(take(&seen).len(), 1);
}
